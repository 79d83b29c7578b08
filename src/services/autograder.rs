use crate::db::types::QuestionType;

/// What the autograder sees of one saved response.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ObjectiveAnswer<'a> {
    pub(crate) question_type: QuestionType,
    pub(crate) question_points: i32,
    pub(crate) selected_option_id: Option<&'a str>,
    pub(crate) option_is_correct: Option<bool>,
}

/// Multiple choice scores all or nothing; a cleared selection scores 0.
/// Free-text questions return `None` and wait for a grader.
pub(crate) fn score(answer: ObjectiveAnswer<'_>) -> Option<i32> {
    if !answer.question_type.is_multiple_choice() {
        return None;
    }

    match (answer.selected_option_id, answer.option_is_correct) {
        (Some(_), Some(true)) => Some(answer.question_points),
        _ => Some(0),
    }
}

/// Sum of graded points; ungraded (`None`) entries contribute nothing.
pub(crate) fn total_points<I>(points: I) -> i32
where
    I: IntoIterator<Item = Option<i32>>,
{
    points.into_iter().flatten().sum()
}
