//! Storage for accepted meter records.
//!
//! [`MeterStore`] is the contract every backend honours; [`Store`] is the
//! backend picked once from configuration and shared by all callers.

pub mod in_memory;
pub mod postgres;

use meter_client::domain::MeterRecord;
use time::Date;

use crate::config::{StorageConfig, StoreKind};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("storage misconfigured: {0}")]
    Config(String),
}

/// Result of a best-effort batch insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: usize,
    /// Records refused because their natural key was already stored.
    pub rejected: Vec<MeterRecord>,
}

impl BatchOutcome {
    /// True when every record in the batch was committed.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Queryable set of meter records keyed by (MPAN, install date, serial).
///
/// Searches that match nothing return an empty vector; `Err` is reserved for
/// backend faults. Inserts are atomic per natural key: of two concurrent
/// inserts with the same key exactly one returns `true`, and an insert that
/// returns `false` has changed nothing.
#[async_trait::async_trait]
pub trait MeterStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<MeterRecord>, StoreError>;

    /// Records whose MPAN, in decimal, starts with `prefix`.
    async fn get_by_mpan(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError>;

    async fn get_by_serial(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError>;

    /// Case-sensitive prefix match.
    async fn get_by_postcode(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError>;

    /// Case-insensitive substring match.
    async fn get_by_address(&self, needle: &str) -> Result<Vec<MeterRecord>, StoreError>;

    async fn get_by_date(&self, date: Date) -> Result<Vec<MeterRecord>, StoreError>;

    async fn try_add(&self, record: MeterRecord) -> Result<bool, StoreError>;

    /// Insert each record independently; accepted records stay committed
    /// when others are rejected.
    async fn try_add_many(&self, records: Vec<MeterRecord>) -> Result<BatchOutcome, StoreError> {
        let mut outcome = BatchOutcome::default();
        for record in records {
            if self.try_add(record.clone()).await? {
                outcome.inserted += 1;
            } else {
                outcome.rejected.push(record);
            }
        }
        Ok(outcome)
    }

    /// Delete the record sharing `record`'s natural key, if any.
    async fn try_remove(&self, record: &MeterRecord) -> Result<bool, StoreError>;
}

/// The configured backend.
pub enum Store {
    InMemory(InMemoryStore),
    Postgres(PostgresStore),
}

impl Store {
    pub async fn connect(cfg: &StorageConfig) -> Result<Self, StoreError> {
        match cfg.kind {
            StoreKind::InMemory => Ok(Self::InMemory(InMemoryStore::new())),
            StoreKind::Postgres => {
                let uri = cfg.uri.as_deref().ok_or_else(|| {
                    StoreError::Config("storage.uri is required for the postgres backend".to_string())
                })?;
                Ok(Self::Postgres(PostgresStore::connect(uri, cfg.max_connections).await?))
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "in_memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $s:ident => $call:expr) => {
        match $self {
            Store::InMemory($s) => $call,
            Store::Postgres($s) => $call,
        }
    };
}

#[async_trait::async_trait]
impl MeterStore for Store {
    async fn get_all(&self) -> Result<Vec<MeterRecord>, StoreError> {
        dispatch!(self, s => s.get_all().await)
    }

    async fn get_by_mpan(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError> {
        dispatch!(self, s => s.get_by_mpan(prefix).await)
    }

    async fn get_by_serial(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError> {
        dispatch!(self, s => s.get_by_serial(prefix).await)
    }

    async fn get_by_postcode(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError> {
        dispatch!(self, s => s.get_by_postcode(prefix).await)
    }

    async fn get_by_address(&self, needle: &str) -> Result<Vec<MeterRecord>, StoreError> {
        dispatch!(self, s => s.get_by_address(needle).await)
    }

    async fn get_by_date(&self, date: Date) -> Result<Vec<MeterRecord>, StoreError> {
        dispatch!(self, s => s.get_by_date(date).await)
    }

    async fn try_add(&self, record: MeterRecord) -> Result<bool, StoreError> {
        dispatch!(self, s => s.try_add(record).await)
    }

    async fn try_add_many(&self, records: Vec<MeterRecord>) -> Result<BatchOutcome, StoreError> {
        dispatch!(self, s => s.try_add_many(records).await)
    }

    async fn try_remove(&self, record: &MeterRecord) -> Result<bool, StoreError> {
        dispatch!(self, s => s.try_remove(record).await)
    }
}
