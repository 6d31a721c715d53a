use color_eyre::{eyre::WrapErr, Result};
use sqlx::postgres::PgPoolOptions;

pub mod cookbooks;
pub mod grocery_lists;
pub mod meal_plans;
pub mod recipes;

#[cfg(feature = "db-tests")]
pub mod test_utils;

pub use sqlx;
pub use sqlx::PgPool;

#[tracing::instrument(skip_all, err)]
pub async fn setup_db_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .wrap_err("Couldn't connect to the database")?;

    const MIGRATION_LOCK_ID: i64 = 0xDB_DB_DB_DB_DB_DB_DB;
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&pool)
        .await
        .wrap_err("Couldn't take the migration lock")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .wrap_err("Failed to run migrations")?;

    let unlocked: Option<bool> = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(&pool)
        .await?;

    if unlocked == Some(true) {
        tracing::info!("Migration lock unlocked");
    } else {
        tracing::warn!("Failed to unlock migration lock");
    }

    Ok(pool)
}
