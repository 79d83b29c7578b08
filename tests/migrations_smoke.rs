use std::time::Duration;

use sqlx::Row;

fn database_url() -> String {
    dotenvy::dotenv().ok();

    for key in ["TEST_DATABASE_URL", "DATABASE_URL"] {
        if let Ok(url) = std::env::var(key) {
            if !url.trim().is_empty() {
                return url;
            }
        }
    }

    let server = std::env::var("POSTGRES_SERVER").unwrap_or_else(|_| "localhost".into());
    let port = std::env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".into());
    let user = std::env::var("POSTGRES_USER").unwrap_or_else(|_| "examroom".into());
    let password = std::env::var("POSTGRES_PASSWORD").unwrap_or_default();
    let db = std::env::var("POSTGRES_DB").unwrap_or_else(|_| "examroom".into());

    format!("postgresql://{user}:{password}@{server}:{port}/{db}")
}

#[tokio::test]
async fn migrations_apply_and_tables_exist() -> anyhow::Result<()> {
    let url = database_url();
    let connect = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&url);
    let pool = match tokio::time::timeout(Duration::from_secs(5), connect).await {
        Ok(Ok(pool)) => pool,
        Ok(Err(err)) => {
            eprintln!("skipping migrations smoke test: {err}");
            return Ok(());
        }
        Err(_) => {
            eprintln!("skipping migrations smoke test: connection timed out");
            return Ok(());
        }
    };

    let migrations_dir =
        std::env::var("EXAMROOM_MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string());
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(&migrations_dir)).await?;
    migrator.run(&pool).await?;

    let tables = [
        "users",
        "exams",
        "questions",
        "question_options",
        "exam_assignments",
        "exam_sessions",
        "responses",
    ];

    for table in tables {
        let row = sqlx::query("SELECT to_regclass($1)::text").bind(table).fetch_one(&pool).await?;
        let regclass: Option<String> = row.try_get(0)?;
        assert!(regclass.is_some(), "expected table {table} to exist after migrations");
    }

    let index_def: Option<String> = sqlx::query_scalar(
        "SELECT indexdef FROM pg_indexes \
         WHERE tablename = 'exam_sessions' AND indexdef ILIKE '%in_progress%'",
    )
    .fetch_optional(&pool)
    .await?;
    let index_def = index_def.expect("partial unique index on in-progress sessions");
    assert!(index_def.contains("UNIQUE"), "unexpected index: {index_def}");

    Ok(())
}
