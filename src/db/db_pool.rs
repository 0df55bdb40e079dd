use duckdb::Connection;
use r2d2::{ManageConnection, Pool};
use std::sync::Mutex;
use tracing::debug;

/// Hands out connections to one DuckDB database instance.
///
/// DuckDB holds a process-level lock on a database file, so every pooled
/// connection is cloned from a single root connection rather than opened
/// afresh. This also lets `:memory:` databases be shared across the pool.
pub struct DuckDBConnectionManager {
    root: Mutex<Connection>,
}

impl DuckDBConnectionManager {
    pub fn open(connection_string: &str) -> Result<Self, duckdb::Error> {
        let root = if connection_string.is_empty() || connection_string == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(connection_string)?
        };
        Ok(Self {
            root: Mutex::new(root),
        })
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let root = self
            .root
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!("Cloning pooled DuckDB connection");
        root.try_clone()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute_batch("SELECT 1")
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

pub type DuckDbPool = Pool<DuckDBConnectionManager>;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Failed to open database: {0}")]
    Open(#[from] duckdb::Error),
    #[error("Failed to build connection pool: {0}")]
    Build(#[from] r2d2::Error),
}

pub fn build_pool(connection_string: &str, size: usize) -> Result<DuckDbPool, PoolError> {
    let manager = DuckDBConnectionManager::open(connection_string)?;
    let pool = Pool::builder()
        .max_size(size.max(1) as u32)
        .build(manager)?;
    Ok(pool)
}
