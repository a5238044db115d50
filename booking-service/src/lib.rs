pub mod api;
pub mod bookings;
pub mod currency;
pub mod error;
pub mod ledger;
pub mod models;
pub mod pricing;
pub mod products;
pub mod projection;
pub mod schema;

use diesel::{Connection, PgConnection};
use diesel_async::{pooled_connection::bb8::Pool, AsyncPgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<AsyncPgConnection>;

/// Rows per multi-row INSERT. Keeps each statement well under the 65,535
/// bind parameters PostgreSQL accepts.
pub(crate) const INSERT_BATCH_ROWS: usize = 1_000;

/// Brings the schema up to date over a blocking connection.
pub fn run_migrations(database_url: &str) -> anyhow::Result<()> {
    let mut conn = PgConnection::establish(database_url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
    Ok(())
}

pub async fn connect_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let config =
        diesel_async::pooled_connection::AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder().build(config).await?;
    Ok(pool)
}
