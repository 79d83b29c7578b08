use thiserror::Error;

/// Failure of a session-core operation.
///
/// `NotFound` also covers rows that exist but are scoped away from the caller,
/// so another user's session is indistinguishable from a missing one.
#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{context}")]
    Database {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl SessionError {
    pub(crate) fn not_found(message: &str) -> Self {
        Self::NotFound(message.to_string())
    }

    pub(crate) fn conflict(message: &str) -> Self {
        Self::Conflict(message.to_string())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// For use with `map_err`: attaches a context string to a database failure.
    pub(crate) fn db(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Database { context, source }
    }
}
