pub(crate) mod access_policy;
pub(crate) mod autograder;
pub(crate) mod catalog;
pub(crate) mod error;
pub(crate) mod grading;
pub(crate) mod session_timing;
pub(crate) mod sessions;
pub(crate) mod submission_finalize;
