//! In-memory metadata store for tests and single-process use.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use plato_core::{CompositeKey, PlatoResult, StorageError, StoreKind};

use super::{MetadataItem, MetadataStore, PutCondition, ScanOrder};

type Partitions = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// Metadata store backed by nested ordered maps.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMetadataStore {
    partitions: Arc<RwLock<Partitions>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of items across all partitions.
    pub fn item_count(&self) -> usize {
        self.partitions
            .read()
            .map(|p| p.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    fn poisoned() -> StorageError {
        StorageError::LockPoisoned {
            store: StoreKind::MetadataStore,
        }
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn put(&self, item: MetadataItem, condition: PutCondition) -> PlatoResult<()> {
        let mut partitions = self.partitions.write().map_err(|_| Self::poisoned())?;

        let exists = partitions
            .get(&item.key.partition)
            .is_some_and(|p| p.contains_key(&item.key.sort));
        if !condition.allows(exists) {
            return Err(StorageError::ConditionFailed {
                key: item.key.to_string(),
                condition: condition.to_string(),
            }
            .into());
        }

        let MetadataItem { key, body } = item;
        partitions
            .entry(key.partition)
            .or_default()
            .insert(key.sort, body);
        Ok(())
    }

    async fn get(&self, key: &CompositeKey) -> PlatoResult<Option<MetadataItem>> {
        let partitions = self.partitions.read().map_err(|_| Self::poisoned())?;
        Ok(partitions
            .get(&key.partition)
            .and_then(|p| p.get(&key.sort))
            .map(|body| MetadataItem::new(key.clone(), body.clone())))
    }

    async fn query(&self, partition: &str, order: ScanOrder) -> PlatoResult<Vec<MetadataItem>> {
        let partitions = self.partitions.read().map_err(|_| Self::poisoned())?;
        let Some(items) = partitions.get(partition) else {
            return Ok(Vec::new());
        };

        let to_item = |(sort, body): (&String, &Vec<u8>)| {
            MetadataItem::new(CompositeKey::new(partition, sort.clone()), body.clone())
        };
        Ok(match order {
            ScanOrder::Ascending => items.iter().map(to_item).collect(),
            ScanOrder::Descending => items.iter().rev().map(to_item).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plato_core::PlatoError;

    fn item(pk: &str, sk: &str, body: &str) -> MetadataItem {
        MetadataItem::new(CompositeKey::new(pk, sk), body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_put_get() {
        let store = InMemoryMetadataStore::new();
        store
            .put(item("P", "S1", "one"), PutCondition::Always)
            .await
            .unwrap();

        let got = store.get(&CompositeKey::new("P", "S1")).await.unwrap();
        assert_eq!(got, Some(item("P", "S1", "one")));
        assert_eq!(store.get(&CompositeKey::new("P", "S2")).await.unwrap(), None);
        assert_eq!(store.item_count(), 1);
    }

    #[tokio::test]
    async fn test_must_not_exist_rejects_duplicate() {
        let store = InMemoryMetadataStore::new();
        store
            .put(item("P", "S", "a"), PutCondition::MustNotExist)
            .await
            .unwrap();
        let err = store
            .put(item("P", "S", "b"), PutCondition::MustNotExist)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlatoError::Storage(StorageError::ConditionFailed { .. })
        ));

        let got = store.get(&CompositeKey::new("P", "S")).await.unwrap().unwrap();
        assert_eq!(got.body, b"a".to_vec());
    }

    #[tokio::test]
    async fn test_must_exist_rejects_missing() {
        let store = InMemoryMetadataStore::new();
        let err = store
            .put(item("P", "S", "a"), PutCondition::MustExist)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlatoError::Storage(StorageError::ConditionFailed { .. })
        ));
        assert_eq!(store.item_count(), 0);
    }

    #[tokio::test]
    async fn test_query_orders_by_sort_key() {
        let store = InMemoryMetadataStore::new();
        for sk in ["b", "c", "a"] {
            store.put(item("P", sk, sk), PutCondition::Always).await.unwrap();
        }
        store.put(item("Q", "z", "z"), PutCondition::Always).await.unwrap();

        let asc: Vec<_> = store
            .query("P", ScanOrder::Ascending)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.key.sort)
            .collect();
        assert_eq!(asc, vec!["a", "b", "c"]);

        let desc: Vec<_> = store
            .query("P", ScanOrder::Descending)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.key.sort)
            .collect();
        assert_eq!(desc, vec!["c", "b", "a"]);

        assert!(store.query("missing", ScanOrder::Ascending).await.unwrap().is_empty());
    }
}
