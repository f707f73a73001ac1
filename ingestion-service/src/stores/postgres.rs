use meter_client::{db::meter_record_queries as queries, domain::MeterRecord};
use sqlx::postgres::{PgPool, PgPoolOptions};
use time::Date;

use super::{MeterStore, StoreError};

/// Durable store backed by the `meter_installations` table.
///
/// Uniqueness is enforced by the table's composite primary key, so the
/// guarantee holds across processes sharing the database.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and bring the schema up to date.
    pub async fn connect(uri: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(uri)
            .await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: PgPool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("meter_installations schema is up to date");
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl MeterStore for PostgresStore {
    async fn get_all(&self) -> Result<Vec<MeterRecord>, StoreError> {
        Ok(queries::all(&self.pool).await?)
    }

    async fn get_by_mpan(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError> {
        Ok(queries::by_mpan_prefix(&self.pool, prefix).await?)
    }

    async fn get_by_serial(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError> {
        Ok(queries::by_serial_prefix(&self.pool, prefix).await?)
    }

    async fn get_by_postcode(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError> {
        Ok(queries::by_postcode_prefix(&self.pool, prefix).await?)
    }

    async fn get_by_address(&self, needle: &str) -> Result<Vec<MeterRecord>, StoreError> {
        Ok(queries::by_address_containing(&self.pool, needle).await?)
    }

    async fn get_by_date(&self, date: Date) -> Result<Vec<MeterRecord>, StoreError> {
        Ok(queries::by_install_date(&self.pool, date).await?)
    }

    async fn try_add(&self, record: MeterRecord) -> Result<bool, StoreError> {
        let inserted = queries::insert_if_absent(&self.pool, &record).await?;
        if !inserted {
            tracing::debug!(mpan = record.mpan, serial = %record.meter_serial, "natural key already stored");
        }
        Ok(inserted)
    }

    async fn try_remove(&self, record: &MeterRecord) -> Result<bool, StoreError> {
        Ok(queries::delete_by_key(&self.pool, record).await?)
    }
}

// These need a live Postgres reachable through DATABASE_URL:
// `cargo test -p meter-ingestion-service -- --ignored`
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::stores::contract;
    use time::macros::date;

    async fn store(pool: PgPool) -> PostgresStore {
        PostgresStore::with_pool(pool).await.unwrap()
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn duplicate_in_batch_is_rejected_alone(pool: PgPool) {
        contract::duplicate_in_batch_is_rejected_alone(&store(pool).await).await;
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn natural_key_is_the_full_tuple(pool: PgPool) {
        contract::natural_key_is_the_full_tuple(&store(pool).await).await;
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn searches_match_by_field(pool: PgPool) {
        contract::searches_match_by_field(&store(pool).await).await;
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn like_metacharacters_match_literally(pool: PgPool) {
        contract::like_metacharacters_match_literally(&store(pool).await).await;
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn remove_requires_exact_key(pool: PgPool) {
        contract::remove_requires_exact_key(&store(pool).await).await;
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn concurrent_inserts_of_one_key_admit_exactly_one(pool: PgPool) {
        let store = Arc::new(store(pool).await);
        let record = contract::record(1_111_111_111_111, "S1", date!(2020 - 01 - 01));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let record = record.clone();
                tokio::spawn(async move { store.try_add(record).await.unwrap() })
            })
            .collect();

        let admitted = futures::future::join_all(tasks)
            .await
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();

        assert_eq!(admitted, 1);
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }
}
