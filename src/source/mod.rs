//! Data sources feeding the pipeline.
//!
//! The pipeline reads its inputs through the [`SnapshotProvider`] contract
//! and never writes back. This module also provides:
//! - [`MemoryStore`]: an in-memory store honoring the replace-not-mutate rule
//! - [`snapshot`]: loading an initial store from a JSON document
//! - [`updates`]: reading a JSONL stream of item updates

use crate::model::{Column, ColumnId, Item, ItemKey, PlanInfo, SubscriptionId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

pub mod snapshot;
pub mod store;
pub mod updates;

pub use snapshot::{load_snapshot, Snapshot};
pub use store::MemoryStore;
pub use updates::{load_updates, parse_updates, ItemUpdate};

/// Latest known item for every identity.
pub type DataById = HashMap<ItemKey, Arc<Item>>;

/// Read-only view of the external data store.
///
/// # Contract
///
/// - An item whose payload changed is replaced by a new `Arc`, never mutated.
/// - `data_by_key` returns the same `Arc` until some item changes.
/// - `items_for_subscriptions` returns the same `Arc` for the same
///   subscriptions until their items change.
pub trait SnapshotProvider {
    /// Column by id. `None` when the column was deleted.
    fn column(&self, id: &ColumnId) -> Option<Arc<Column>>;

    /// Position of the column among its siblings.
    fn column_index(&self, id: &ColumnId) -> Option<usize>;

    /// Ids of all columns, in position order.
    fn column_ids(&self) -> Vec<ColumnId>;

    /// Union of the items of the given subscriptions, deduplicated by identity.
    fn items_for_subscriptions(&self, ids: &[SubscriptionId]) -> Arc<[Arc<Item>]>;

    /// Latest known item for an identity.
    fn item_by_key(&self, key: &ItemKey) -> Option<Arc<Item>>;

    /// Snapshot of every identity's latest item.
    fn data_by_key(&self) -> Arc<DataById>;

    /// Login of the signed-in user.
    fn logged_in_user(&self) -> Option<String>;

    /// Subscription plan of the signed-in user.
    fn plan(&self) -> Option<PlanInfo>;

    /// When the given subscriptions were last fetched, as the oldest fetch
    /// among those that were fetched at all.
    fn last_fetched_at(&self, ids: &[SubscriptionId]) -> Option<DateTime<Utc>>;
}
