//! In-memory partitioned store.
//!
//! Backs tests and the local server harness with the same paging semantics
//! as [`PgPartitionedStore`](crate::store::PgPartitionedStore): key-ordered
//! scans, over-fetch-by-one remainder detection, and filter-after-scan via
//! the shared page assembly.

use crate::errors::ApiError;
use crate::store::{assemble_page, Attributes, Page, PartitionedStore, QueryOptions, StoreItem};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A `BTreeMap` keyed on (partition, sort) gives the key ordering the trait
/// contract requires.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    items: Arc<RwLock<BTreeMap<(String, String), Attributes>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items across all partitions, for test assertions.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl PartitionedStore for InMemoryStore {
    async fn put(
        &self,
        partition_key: &str,
        sort_key: &str,
        attributes: Attributes,
    ) -> Result<(), ApiError> {
        let mut items = self.items.write().await;
        items.insert((partition_key.to_string(), sort_key.to_string()), attributes);
        Ok(())
    }

    async fn get(
        &self,
        partition_key: &str,
        sort_key: &str,
    ) -> Result<Option<StoreItem>, ApiError> {
        let items = self.items.read().await;
        Ok(items
            .get(&(partition_key.to_string(), sort_key.to_string()))
            .map(|attributes| StoreItem {
                partition_key: partition_key.to_string(),
                sort_key: sort_key.to_string(),
                attributes: attributes.clone(),
            }))
    }

    async fn query_page(
        &self,
        partition_key: &str,
        options: QueryOptions,
    ) -> Result<Page, ApiError> {
        let items = self.items.read().await;

        // Full key range of the partition, ordered ascending by sort key.
        let in_partition: Vec<(&(String, String), &Attributes)> = items
            .range((
                Bound::Included((partition_key.to_string(), String::new())),
                Bound::Unbounded,
            ))
            .take_while(|((pk, _), _)| pk == partition_key)
            .collect();

        let exclusive_start = options.cursor.as_ref().map(|c| c.item_id.as_str());
        let fetch = options.limit as usize + 1;

        let to_item = |((pk, sk), attributes): &(&(String, String), &Attributes)| StoreItem {
            partition_key: pk.clone(),
            sort_key: sk.clone(),
            attributes: (*attributes).clone(),
        };

        let scanned: Vec<StoreItem> = if options.scan_descending {
            in_partition
                .iter()
                .rev()
                .filter(|((_, sk), _)| exclusive_start.map_or(true, |start| sk.as_str() < start))
                .take(fetch)
                .map(to_item)
                .collect()
        } else {
            in_partition
                .iter()
                .filter(|((_, sk), _)| exclusive_start.map_or(true, |start| sk.as_str() > start))
                .take(fetch)
                .map(to_item)
                .collect()
        };

        Ok(assemble_page(
            scanned,
            options.limit,
            options.filter.as_ref(),
        ))
    }

    async fn query_flag_index(
        &self,
        partition_key: &str,
        attribute: &str,
        value: bool,
        limit: u32,
    ) -> Result<Vec<StoreItem>, ApiError> {
        let items = self.items.read().await;

        let in_partition: Vec<(&(String, String), &Attributes)> = items
            .range((
                Bound::Included((partition_key.to_string(), String::new())),
                Bound::Unbounded,
            ))
            .take_while(|((pk, _), _)| pk == partition_key)
            .collect();

        Ok(in_partition
            .iter()
            .rev()
            .filter(|(_, attributes)| {
                attributes
                    .get(attribute)
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
                    == value
            })
            .take(limit as usize)
            .map(|((pk, sk), attributes)| StoreItem {
                partition_key: pk.clone(),
                sort_key: sk.clone(),
                attributes: (*attributes).clone(),
            })
            .collect())
    }

    async fn update(
        &self,
        partition_key: &str,
        sort_key: &str,
        deltas: Attributes,
    ) -> Result<(), ApiError> {
        let mut items = self.items.write().await;
        let entry = items
            .entry((partition_key.to_string(), sort_key.to_string()))
            .or_default();
        for (key, value) in deltas {
            entry.insert(key, value);
        }
        Ok(())
    }
}
