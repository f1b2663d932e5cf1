use color_eyre::{eyre::eyre, eyre::Context, Result};
use sqlx::postgres::PgPoolOptions;

pub mod auth_tokens;
pub mod cooking;
pub mod follows;
pub mod pagination;
pub mod shopping_list;
pub mod users;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use pagination::Page;
pub use shopping_list::PgCartSource;
pub use sqlx;
pub use sqlx::PgPool;

#[tracing::instrument(err)]
pub async fn setup_db_pool() -> Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL").wrap_err("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .wrap_err("Failed to connect to the database")?;

    migrate(&pool).await?;

    Ok(pool)
}

/// Runs pending migrations while holding an advisory lock. Lock, migrate
/// and unlock share one connection since the lock is session scoped.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    const MIGRATION_LOCK_ID: i64 = 0xF0_0D_F0_0D_F0_0D;

    let mut conn = pool.acquire().await?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&mut *conn)
        .await?;

    sqlx::migrate!().run(&mut *conn).await?;

    let unlock_result: Option<bool> = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(&mut *conn)
        .await?;

    match unlock_result {
        Some(true) => tracing::info!("Migration lock unlocked"),
        Some(false) => tracing::info!("Failed to unlock migration lock"),
        None => return Err(eyre!("Failed to unlock migration lock")),
    }

    Ok(())
}
