//! Client-side session driver.
//!
//! A [`SessionTimer`] recomputes the remaining time from the session's start and the exam's
//! time limit on every tick, flushes buffered answers on an autosave cadence, and submits
//! exactly once when time runs out or the student submits by hand. [`SessionActions`] is the
//! seam it talks through; [`HttpSessionClient`] implements it against the HTTP API.

mod drafts;
mod http;
mod timer;

use async_trait::async_trait;
use thiserror::Error;

pub use drafts::{Draft, DraftBuffer, FlushReport};
pub use http::{ActiveSessionSnapshot, HttpSessionClient};
pub use timer::{
    Clock, Countdown, SessionTimer, SubmitTrigger, SystemClock, TimerConfig, TimerOutcome,
};

/// What the server reported after a successful submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub total_points: i32,
    pub is_late: bool,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },
}

impl ClientError {
    /// The server no longer considers the session active (already submitted or swept).
    pub fn is_session_closed(&self) -> bool {
        matches!(self, Self::Status { status: 404 | 409, .. })
    }
}

/// Operations the timer needs from the backend.
#[async_trait]
pub trait SessionActions: Send + Sync {
    async fn save(&self, draft: &Draft) -> Result<(), ClientError>;

    async fn submit(&self) -> Result<SubmitReceipt, ClientError>;
}
