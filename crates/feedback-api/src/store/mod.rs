//! Partitioned store client.
//!
//! A generic primitive over a partition-key + sort-key collection, reused by
//! the feedback and report services. Items within a partition are ordered by
//! sort key; sort keys embed creation timestamps, so "descending" means most
//! recent first.
//!
//! # Pagination semantics
//!
//! `query_page` applies `limit` to the SCANNED key range and the optional
//! filter predicate to the resulting page, mirroring the behavior of
//! filter-after-scan stores. A filtered page can therefore hold fewer than
//! `limit` items even when more matching items exist deeper in the
//! partition; `has_more` and `next_cursor` reflect the raw scan remainder,
//! and callers follow the cursor until `has_more` is false.
//!
//! Pagination across concurrent writers is best-effort: a page may miss or
//! double-count an item mutated between page fetches.

pub mod cursor;
pub mod memory;
pub mod postgres;

pub use cursor::{Cursor, CursorError};
pub use memory::InMemoryStore;
pub use postgres::PgPartitionedStore;

use crate::errors::ApiError;
use serde_json::{Map, Value};

/// Item attributes: a JSON object including the key fields themselves.
pub type Attributes = Map<String, Value>;

/// Post-scan filter applied to a page before it is returned.
pub type FilterPredicate = Box<dyn Fn(&Attributes) -> bool + Send + Sync>;

/// An item read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreItem {
    pub partition_key: String,
    pub sort_key: String,
    pub attributes: Attributes,
}

/// Options for a key-range page query.
pub struct QueryOptions {
    /// Maximum number of SCANNED items in the page.
    pub limit: u32,

    /// Resume point from a prior page; the scan restarts exclusively after
    /// this key.
    pub cursor: Option<Cursor>,

    /// Most recent first when true (the default).
    pub scan_descending: bool,

    /// Applied after the key-range scan, before the page is returned.
    pub filter: Option<FilterPredicate>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: 50,
            cursor: None,
            scan_descending: true,
            filter: None,
        }
    }
}

impl std::fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOptions")
            .field("limit", &self.limit)
            .field("cursor", &self.cursor)
            .field("scan_descending", &self.scan_descending)
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

/// One page of a key-range scan.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<StoreItem>,
    /// Present only when the raw scan has remaining items.
    pub next_cursor: Option<Cursor>,
    /// Whether the raw (unfiltered) scan has remaining items.
    pub has_more: bool,
}

/// The partition-key + sort-key store primitive.
///
/// Implemented by [`PgPartitionedStore`] for production and
/// [`InMemoryStore`] for tests; both share the exact paging semantics
/// described at the module level.
#[async_trait::async_trait]
pub trait PartitionedStore: Send + Sync {
    /// Unconditional upsert. Uniqueness is guaranteed by callers choosing
    /// sort keys that embed a timestamp plus a random suffix.
    async fn put(
        &self,
        partition_key: &str,
        sort_key: &str,
        attributes: Attributes,
    ) -> Result<(), ApiError>;

    /// Point lookup.
    async fn get(&self, partition_key: &str, sort_key: &str)
        -> Result<Option<StoreItem>, ApiError>;

    /// Key-ordered page scan for a partition. See the module docs for the
    /// filter/limit interaction.
    async fn query_page(&self, partition_key: &str, options: QueryOptions)
        -> Result<Page, ApiError>;

    /// Query via the secondary ordering index on a boolean attribute,
    /// bypassing the filter-after-scan caveat of `query_page`.
    async fn query_flag_index(
        &self,
        partition_key: &str,
        attribute: &str,
        value: bool,
        limit: u32,
    ) -> Result<Vec<StoreItem>, ApiError>;

    /// Partial attribute merge: listed attributes are set, unlisted ones are
    /// untouched. Last writer wins; no optimistic concurrency check.
    async fn update(
        &self,
        partition_key: &str,
        sort_key: &str,
        deltas: Attributes,
    ) -> Result<(), ApiError>;
}

/// Shared page assembly: truncate the over-fetched scan, derive the cursor
/// from the UNFILTERED page tail, then apply the filter.
///
/// Both store implementations over-fetch one row beyond `limit` to learn
/// whether the scan has a remainder; this helper keeps their semantics
/// identical.
pub(crate) fn assemble_page(
    mut scanned: Vec<StoreItem>,
    limit: u32,
    filter: Option<&FilterPredicate>,
) -> Page {
    let limit = limit as usize;
    let has_more = scanned.len() > limit;
    scanned.truncate(limit);

    let next_cursor = if has_more {
        scanned
            .last()
            .map(|item| Cursor::new(item.partition_key.clone(), item.sort_key.clone()))
    } else {
        None
    };

    let items = match filter {
        Some(predicate) => scanned
            .into_iter()
            .filter(|item| predicate(&item.attributes))
            .collect(),
        None => scanned,
    };

    Page {
        items,
        next_cursor,
        has_more,
    }
}
