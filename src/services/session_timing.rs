use time::{Duration, PrimitiveDateTime};

use crate::db::models::Exam;

/// The deadline is never stored; it is always derived from the exam's current time limit.
pub(crate) fn deadline(started_at: PrimitiveDateTime, time_limit_minutes: i32) -> PrimitiveDateTime {
    started_at + Duration::minutes(i64::from(time_limit_minutes))
}

pub(crate) fn remaining_seconds(deadline: PrimitiveDateTime, now: PrimitiveDateTime) -> i64 {
    (deadline - now).whole_seconds().max(0)
}

/// True once `now` is strictly beyond `deadline + grace`.
pub(crate) fn is_past_grace(
    deadline: PrimitiveDateTime,
    now: PrimitiveDateTime,
    grace_seconds: u64,
) -> bool {
    let grace = Duration::seconds(i64::try_from(grace_seconds).unwrap_or(i64::MAX));
    now > deadline.saturating_add(grace)
}

/// Finalized, and `now` inside the optional availability window.
pub(crate) fn is_available(exam: &Exam, now: PrimitiveDateTime) -> bool {
    if !exam.is_finalized {
        return false;
    }
    if exam.available_from.is_some_and(|from| now < from) {
        return false;
    }
    if exam.available_to.is_some_and(|to| now > to) {
        return false;
    }
    true
}
