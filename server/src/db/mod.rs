//! Postgres pool for the stroke, cursor and room tables.
//!
//! Only used when `DATABASE_URL` is set. Migrations run before the listener
//! binds, so handlers never see an old schema.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Connect and bring the schema up to date.
///
/// # Errors
///
/// Connection or migration failure.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
    sqlx::migrate!("src/db/migrations").run(&pool).await?;
    info!(max_connections, "db: pool ready, migrations applied");
    Ok(pool)
}
