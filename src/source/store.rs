//! In-memory store implementing [`SnapshotProvider`].
//!
//! Writes are copy-on-write: the identity map is shared with readers through
//! an `Arc` and cloned by `Arc::make_mut` only while a reader still holds the
//! previous snapshot. Every write bumps a generation counter that
//! invalidates cached subscription unions.

use super::updates::ItemUpdate;
use super::{DataById, SnapshotProvider};
use crate::model::{
    resolve_identity, Column, ColumnFilters, ColumnId, Item, ItemKey, PlanInfo, SubscriptionId,
};
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
struct UnionEntry {
    generation: u64,
    items: Arc<[Arc<Item>]>,
}

/// In-memory item and column store.
#[derive(Debug)]
pub struct MemoryStore {
    columns: Vec<Arc<Column>>,
    subscriptions: HashMap<SubscriptionId, Vec<Arc<Item>>>,
    data: Arc<DataById>,
    logged_in_user: Option<String>,
    plan: Option<PlanInfo>,
    fetched_at: HashMap<SubscriptionId, DateTime<Utc>>,
    generation: u64,
    unions: RefCell<HashMap<Vec<SubscriptionId>, UnionEntry>>,
    empty: Arc<[Arc<Item>]>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            subscriptions: HashMap::new(),
            data: Arc::new(DataById::new()),
            logged_in_user: None,
            plan: None,
            fetched_at: HashMap::new(),
            generation: 0,
            unions: RefCell::new(HashMap::new()),
            empty: Arc::from(Vec::new()),
        }
    }

    /// Number of write operations applied so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ===== Columns =====

    /// Append a column, or replace the column with the same id in place.
    pub fn put_column(&mut self, column: Column) {
        let column = Arc::new(column);
        match self.columns.iter_mut().find(|c| c.id == column.id) {
            Some(slot) => *slot = column,
            None => self.columns.push(column),
        }
    }

    /// Remove a column. Returns whether it existed.
    pub fn remove_column(&mut self, id: &ColumnId) -> bool {
        let before = self.columns.len();
        self.columns.retain(|c| &c.id != id);
        before != self.columns.len()
    }

    /// Move a column to a new position (clamped to the last position).
    pub fn move_column(&mut self, id: &ColumnId, position: usize) -> bool {
        let Some(from) = self.columns.iter().position(|c| &c.id == id) else {
            return false;
        };
        let column = self.columns.remove(from);
        let to = position.min(self.columns.len());
        self.columns.insert(to, column);
        true
    }

    /// Replace a column's filters.
    pub fn set_column_filters(&mut self, id: &ColumnId, filters: ColumnFilters) -> bool {
        self.update_column(id, |column| column.filters = filters)
    }

    /// Hide every item updated at or before `at` in the given column.
    pub fn clear_column(&mut self, id: &ColumnId, at: DateTime<Utc>) -> bool {
        self.update_column(id, |column| column.filters.cleared_at = Some(at))
    }

    fn update_column<F>(&mut self, id: &ColumnId, change: F) -> bool
    where
        F: FnOnce(&mut Column),
    {
        let Some(slot) = self.columns.iter_mut().find(|c| &c.id == id) else {
            return false;
        };
        let mut column = Column::clone(slot);
        change(&mut column);
        *slot = Arc::new(column);
        true
    }

    // ===== Session =====

    /// Set the login used by `hide_own_events`.
    pub fn set_logged_in_user(&mut self, login: Option<String>) {
        self.logged_in_user = login;
    }

    /// Set the plan deciding whether private items show.
    pub fn set_plan(&mut self, plan: Option<PlanInfo>) {
        self.plan = plan;
    }

    /// Record a completed fetch of a subscription.
    pub fn set_last_fetched_at(&mut self, subscription: &SubscriptionId, at: DateTime<Utc>) {
        self.fetched_at.insert(subscription.clone(), at);
    }

    // ===== Items =====

    /// Insert or replace an item in a subscription.
    ///
    /// The item always gets a fresh `Arc`. Items with an identity replace
    /// every existing item with the same identity, in every subscription;
    /// items without one are appended.
    pub fn upsert(&mut self, subscription: &SubscriptionId, item: Item) -> Option<ItemKey> {
        let key = resolve_identity(&item);
        let item = Arc::new(item);

        match &key {
            Some(key) => {
                Arc::make_mut(&mut self.data).insert(key.clone(), Arc::clone(&item));
                for items in self.subscriptions.values_mut() {
                    for slot in items.iter_mut() {
                        if resolve_identity(slot).as_ref() == Some(key) {
                            *slot = Arc::clone(&item);
                        }
                    }
                }
                let target = self.subscriptions.entry(subscription.clone()).or_default();
                if !target
                    .iter()
                    .any(|existing| resolve_identity(existing).as_ref() == Some(key))
                {
                    target.push(item);
                }
            }
            None => {
                self.subscriptions
                    .entry(subscription.clone())
                    .or_default()
                    .push(item);
            }
        }

        self.generation += 1;
        key
    }

    /// Remove an item from every subscription. Returns whether it existed.
    pub fn remove(&mut self, key: &ItemKey) -> bool {
        let existed = self.data.contains_key(key);
        if existed {
            Arc::make_mut(&mut self.data).remove(key);
        }
        for items in self.subscriptions.values_mut() {
            items.retain(|item| resolve_identity(item).as_ref() != Some(key));
        }
        self.generation += 1;
        existed
    }

    /// Apply one update from an update stream.
    pub fn apply(&mut self, update: ItemUpdate) {
        match update {
            ItemUpdate::Upsert { subscription, item } => {
                let key = self.upsert(&subscription, item);
                debug!(?key, %subscription, "Applied item upsert");
            }
            ItemUpdate::Remove { key } => {
                let existed = self.remove(&key);
                debug!(%key, existed, "Applied item removal");
            }
        }
    }

    fn compute_union(&self, ids: &[SubscriptionId]) -> Vec<Arc<Item>> {
        let mut seen: HashSet<ItemKey> = HashSet::new();
        let mut union = Vec::new();
        for id in ids {
            let Some(items) = self.subscriptions.get(id) else {
                continue;
            };
            for item in items {
                match resolve_identity(item) {
                    Some(key) => {
                        if seen.insert(key) {
                            union.push(Arc::clone(item));
                        }
                    }
                    None => union.push(Arc::clone(item)),
                }
            }
        }
        union
    }
}

impl SnapshotProvider for MemoryStore {
    fn column(&self, id: &ColumnId) -> Option<Arc<Column>> {
        self.columns.iter().find(|c| &c.id == id).cloned()
    }

    fn column_index(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| &c.id == id)
    }

    fn column_ids(&self) -> Vec<ColumnId> {
        self.columns.iter().map(|c| c.id.clone()).collect()
    }

    fn items_for_subscriptions(&self, ids: &[SubscriptionId]) -> Arc<[Arc<Item>]> {
        if ids.is_empty() {
            return Arc::clone(&self.empty);
        }

        let mut unions = self.unions.borrow_mut();
        let previous = unions.get(ids).cloned();
        if let Some(entry) = &previous {
            if entry.generation == self.generation {
                return Arc::clone(&entry.items);
            }
        }

        let union = self.compute_union(ids);
        // Keep the previous allocation when the write did not touch these subscriptions
        let items = match previous {
            Some(entry)
                if entry.items.len() == union.len()
                    && entry
                        .items
                        .iter()
                        .zip(&union)
                        .all(|(a, b)| Arc::ptr_eq(a, b)) =>
            {
                entry.items
            }
            _ if union.is_empty() => Arc::clone(&self.empty),
            _ => Arc::from(union),
        };

        unions.insert(
            ids.to_vec(),
            UnionEntry {
                generation: self.generation,
                items: Arc::clone(&items),
            },
        );
        items
    }

    fn item_by_key(&self, key: &ItemKey) -> Option<Arc<Item>> {
        self.data.get(key).cloned()
    }

    fn data_by_key(&self) -> Arc<DataById> {
        Arc::clone(&self.data)
    }

    fn logged_in_user(&self) -> Option<String> {
        self.logged_in_user.clone()
    }

    fn plan(&self) -> Option<PlanInfo> {
        self.plan.clone()
    }

    fn last_fetched_at(&self, ids: &[SubscriptionId]) -> Option<DateTime<Utc>> {
        ids.iter().filter_map(|id| self.fetched_at.get(id)).min().copied()
    }
}
