use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

/// Connect the pool and bring the schema up to date.
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;
    info!("database ready");

    Ok(db)
}

#[cfg(test)]
pub(crate) mod tests {
    use sqlx::PgPool;

    /// Pool against `DATABASE_URL`, or `None` so database tests skip
    /// on machines without Postgres.
    pub(crate) async fn pool() -> Option<PgPool> {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").ok()?;
        Some(super::connect(&url).await.expect("test database"))
    }
}
