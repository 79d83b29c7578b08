pub(crate) async fn is_assigned(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM exam_assignments WHERE exam_id = $1 AND user_id = $2)",
    )
    .bind(exam_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Inserts missing pairs and leaves existing ones alone. Returns the number of new rows.
pub(crate) async fn assign_many(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    user_ids: &[String],
    assigned_at: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO exam_assignments (exam_id, user_id, assigned_at)
         SELECT $1, user_id, $3 FROM UNNEST($2::text[]) AS user_id
         ON CONFLICT (exam_id, user_id) DO NOTHING",
    )
    .bind(exam_id)
    .bind(user_ids)
    .bind(assigned_at)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
