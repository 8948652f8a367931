//! Domain model types (pure).
//!
//! Items, columns and identities. Nothing here knows about caching or layout.

pub mod column;
pub mod error;
pub mod identity;
pub mod item;

// Re-export for convenience
pub use column::{
    ActivityFilters, Column, ColumnFilters, ColumnId, ColumnType, FilterRecord,
    NotificationFilters, PlanInfo, SubscriptionId,
};
pub use identity::{identity_keys, resolve_identity, InvalidItemKey, ItemKey, LocalId};
pub use item::{Item, ItemPayload};
