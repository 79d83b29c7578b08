use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Admin,
    Instructor,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questiontype", rename_all = "snake_case")]
pub(crate) enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    Essay,
}

impl QuestionType {
    pub(crate) fn is_multiple_choice(self) -> bool {
        matches!(self, Self::MultipleChoice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "sessionstatus", rename_all = "snake_case")]
pub(crate) enum SessionStatus {
    InProgress,
    Submitted,
    Graded,
}

impl SessionStatus {
    /// Progression is one-directional; staying in `Graded` covers regrading.
    pub(crate) fn can_transition_to(self, next: SessionStatus) -> bool {
        match (self, next) {
            (Self::InProgress, Self::Submitted) => true,
            (Self::Submitted, Self::Submitted | Self::Graded) => true,
            (Self::Graded, Self::Graded) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "submitmode", rename_all = "snake_case")]
pub(crate) enum SubmitMode {
    Manual,
    AutoDeadline,
}

impl SubmitMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AutoDeadline => "auto_deadline",
        }
    }
}
