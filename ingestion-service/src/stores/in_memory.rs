use std::collections::{hash_map::Entry, HashMap};

use meter_client::domain::{MeterRecord, NaturalKey};
use parking_lot::RwLock;
use time::Date;

use super::{BatchOutcome, MeterStore, StoreError};

/// Process-local store. Readers share the lock; each insert checks and
/// writes under a single write guard.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<NaturalKey, MeterRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn select(&self, keep: impl Fn(&MeterRecord) -> bool) -> Vec<MeterRecord> {
        self.entries
            .read()
            .values()
            .filter(|r| keep(r))
            .cloned()
            .collect()
    }
}

fn insert_if_absent(entries: &mut HashMap<NaturalKey, MeterRecord>, record: MeterRecord) -> bool {
    match entries.entry(record.natural_key()) {
        Entry::Vacant(slot) => {
            slot.insert(record);
            true
        }
        Entry::Occupied(_) => false,
    }
}

#[async_trait::async_trait]
impl MeterStore for InMemoryStore {
    async fn get_all(&self) -> Result<Vec<MeterRecord>, StoreError> {
        Ok(self.select(|_| true))
    }

    async fn get_by_mpan(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError> {
        Ok(self.select(|r| r.mpan.to_string().starts_with(prefix)))
    }

    async fn get_by_serial(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError> {
        Ok(self.select(|r| r.meter_serial.starts_with(prefix)))
    }

    async fn get_by_postcode(&self, prefix: &str) -> Result<Vec<MeterRecord>, StoreError> {
        Ok(self.select(|r| r.postcode.as_deref().is_some_and(|p| p.starts_with(prefix))))
    }

    async fn get_by_address(&self, needle: &str) -> Result<Vec<MeterRecord>, StoreError> {
        let needle = needle.to_lowercase();
        Ok(self.select(|r| {
            r.address_line1
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(&needle))
        }))
    }

    async fn get_by_date(&self, date: Date) -> Result<Vec<MeterRecord>, StoreError> {
        Ok(self.select(|r| r.date_of_installation == date))
    }

    async fn try_add(&self, record: MeterRecord) -> Result<bool, StoreError> {
        Ok(insert_if_absent(&mut self.entries.write(), record))
    }

    async fn try_add_many(&self, records: Vec<MeterRecord>) -> Result<BatchOutcome, StoreError> {
        let mut outcome = BatchOutcome::default();
        let mut entries = self.entries.write();
        for record in records {
            if entries.contains_key(&record.natural_key()) {
                outcome.rejected.push(record);
            } else {
                insert_if_absent(&mut entries, record);
                outcome.inserted += 1;
            }
        }
        Ok(outcome)
    }

    async fn try_remove(&self, record: &MeterRecord) -> Result<bool, StoreError> {
        Ok(self.entries.write().remove(&record.natural_key()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::stores::contract;
    use time::macros::date;

    #[tokio::test]
    async fn duplicate_in_batch_is_rejected_alone() {
        contract::duplicate_in_batch_is_rejected_alone(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn natural_key_is_the_full_tuple() {
        contract::natural_key_is_the_full_tuple(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn searches_match_by_field() {
        contract::searches_match_by_field(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn like_metacharacters_match_literally() {
        contract::like_metacharacters_match_literally(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn remove_requires_exact_key() {
        contract::remove_requires_exact_key(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn duplicate_within_one_batch_keeps_the_first() {
        let store = InMemoryStore::new();
        let first = contract::record(1_111_111_111_111, "S1", date!(2020 - 01 - 01));
        let mut second = first.clone();
        second.postcode = Some("SW1A 1AA".to_string());

        let outcome = store.try_add_many(vec![first.clone(), second.clone()]).await.unwrap();
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.rejected, vec![second]);
        assert_eq!(store.get_all().await.unwrap(), vec![first]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_of_one_key_admit_exactly_one() {
        let store = Arc::new(InMemoryStore::new());
        let record = contract::record(1_111_111_111_111, "S1", date!(2020 - 01 - 01));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let store = Arc::clone(&store);
                let record = record.clone();
                tokio::spawn(async move { store.try_add(record).await.unwrap() })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        let admitted = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();

        assert_eq!(admitted, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_batches_never_double_insert() {
        let store = Arc::new(InMemoryStore::new());
        let batch: Vec<_> = (0..50u64)
            .map(|i| contract::record(1_000_000_000_000 + i, "S1", date!(2020 - 01 - 01)))
            .collect();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let batch = batch.clone();
                tokio::spawn(async move { store.try_add_many(batch).await.unwrap() })
            })
            .collect();

        let inserted: usize = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().inserted)
            .sum();

        assert_eq!(inserted, 50);
        assert_eq!(store.len(), 50);
    }
}
