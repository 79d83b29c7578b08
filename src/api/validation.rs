use validator::Validate;

use crate::api::errors::ApiError;

/// Shape checks run before any persistence work.
pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))
}
