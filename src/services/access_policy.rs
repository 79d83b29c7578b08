//! Capability checks shared by every session, catalog and grading operation.

use crate::db::models::{Exam, ExamSession, User};
use crate::db::types::UserRole;
use crate::repositories;

pub(crate) fn is_admin(user: &User) -> bool {
    user.role == UserRole::Admin
}

pub(crate) fn is_instructor(user: &User) -> bool {
    matches!(user.role, UserRole::Instructor | UserRole::Admin)
}

pub(crate) fn is_exam_creator(user: &User, exam: &Exam) -> bool {
    exam.created_by == user.id
}

pub(crate) fn can_manage_exam(user: &User, exam: &Exam) -> bool {
    is_exam_creator(user, exam) || is_admin(user)
}

pub(crate) fn can_grade(user: &User, exam: &Exam) -> bool {
    can_manage_exam(user, exam)
}

pub(crate) fn owns_session(user: &User, session: &ExamSession) -> bool {
    session.user_id == user.id
}

pub(crate) async fn is_assignee(
    executor: impl sqlx::PgExecutor<'_>,
    user: &User,
    exam: &Exam,
) -> Result<bool, sqlx::Error> {
    repositories::assignments::is_assigned(executor, &exam.id, &user.id).await
}

#[cfg(test)]
pub(crate) mod fixtures {
    use time::macros::datetime;

    use crate::db::models::{Exam, ExamSession, User};
    use crate::db::types::{SessionStatus, UserRole};

    pub(crate) fn user(id: &str, role: UserRole) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            hashed_password: String::new(),
            full_name: id.to_string(),
            role,
            is_active: true,
            created_at: datetime!(2025-01-01 0:00),
            updated_at: datetime!(2025-01-01 0:00),
        }
    }

    pub(crate) fn exam(id: &str, created_by: &str) -> Exam {
        Exam {
            id: id.to_string(),
            title: "Exam".to_string(),
            description: None,
            time_limit_minutes: 60,
            available_from: None,
            available_to: None,
            is_finalized: true,
            created_by: created_by.to_string(),
            created_at: datetime!(2025-01-01 0:00),
            updated_at: datetime!(2025-01-01 0:00),
        }
    }

    pub(crate) fn session(id: &str, exam_id: &str, user_id: &str) -> ExamSession {
        ExamSession {
            id: id.to_string(),
            exam_id: exam_id.to_string(),
            user_id: user_id.to_string(),
            started_at: datetime!(2025-01-01 9:00),
            submitted_at: None,
            status: SessionStatus::InProgress,
            total_points: None,
            is_late: false,
            submit_mode: None,
            created_at: datetime!(2025-01-01 9:00),
            updated_at: datetime!(2025-01-01 9:00),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{exam, session, user};
    use super::*;

    #[test]
    fn creator_and_admin_can_grade() {
        let creator = user("creator", UserRole::Instructor);
        let other_instructor = user("other", UserRole::Instructor);
        let admin = user("admin", UserRole::Admin);
        let exam = exam("exam-1", "creator");

        assert!(can_grade(&creator, &exam));
        assert!(can_grade(&admin, &exam));
        assert!(!can_grade(&other_instructor, &exam));
    }

    #[test]
    fn students_are_not_instructors() {
        assert!(!is_instructor(&user("s", UserRole::Student)));
        assert!(is_instructor(&user("i", UserRole::Instructor)));
        assert!(is_instructor(&user("a", UserRole::Admin)));
    }

    #[test]
    fn session_ownership_is_by_user_id() {
        let owner = user("owner", UserRole::Student);
        let stranger = user("stranger", UserRole::Admin);
        let session = session("s-1", "exam-1", "owner");

        assert!(owns_session(&owner, &session));
        assert!(!owns_session(&stranger, &session));
    }
}
