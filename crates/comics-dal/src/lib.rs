pub mod comic;
pub mod error;
pub mod filters;
pub mod query;
pub mod validation;
pub mod volumes;

use std::{str::FromStr as _, time::Duration};

pub use error::Error;
pub use filters::{Batch, Filters, Metadata};
pub use sqlx::Error as SqlxError;
pub use validation::{ValidationContext, ValidationErrors};
pub use volumes::Volumes;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type Pool = sqlx::Pool<ChosenDB>;

/// Deadline applied to every repository call unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(50)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}
