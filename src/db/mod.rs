mod from_row;
pub mod queries;
mod schema;

pub use schema::init_db;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::jwt::TokenIssuer;
use crate::payments::Payments;
use crate::pricing::PriceList;

pub type DbPool = Pool<SqliteConnectionManager>;

/// How long a connection waits on a locked database before giving up.
/// Concurrent purchases serialize on the write lock instead of failing.
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub tokens: Arc<TokenIssuer>,
    pub payments: Payments,
    pub prices: PriceList,
    pub payment_timeout: Duration,
    pub bootstrap_admin_email: Option<String>,
}

/// Open a pooled, file-backed SQLite database and apply the schema.
pub fn create_pool(path: impl AsRef<Path>, max_size: u32) -> crate::error::Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.pragma_update(None, "foreign_keys", true)
    });
    let pool = Pool::builder().max_size(max_size).build(manager)?;

    let conn = pool.get()?;
    init_db(&conn)?;

    Ok(pool)
}
