//! Feed items.
//!
//! Items are owned by the store and shared with the pipeline as `Arc<Item>`.
//! The pipeline never mutates an item. Stores must replace the `Arc` whenever
//! an item's payload changes; reference identity is the version token every
//! per-item cache relies on.

use super::identity::{lenient_local_id, ItemKey, LocalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single feed item: a notification or an activity event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Global node identifier (preferred identity).
    #[serde(default)]
    pub node_id: Option<String>,
    /// Local identifier (identity fallback). Unusable ids load as `None`.
    #[serde(default, deserialize_with = "lenient_local_id")]
    pub id: Option<LocalId>,
    /// Card title (notification subject or event summary).
    #[serde(default)]
    pub title: String,
    /// Repository full name, `owner/name`.
    #[serde(default)]
    pub repo: Option<String>,
    /// Login of the user who triggered the item.
    #[serde(default)]
    pub actor: Option<String>,
    /// Whether the item belongs to a private repository.
    #[serde(default)]
    pub is_private: bool,
    /// Unread state. Absent means read.
    #[serde(default)]
    pub unread: Option<bool>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Type-specific payload.
    #[serde(flatten)]
    pub payload: ItemPayload,
    /// Identities absorbed into this item by merge-similar.
    #[serde(default, skip_serializing_if = "Vec::is_empty", skip_deserializing)]
    pub merged: Vec<ItemKey>,
}

/// Type-specific part of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemPayload {
    /// An inbox notification.
    Notification {
        /// Why the user was notified (`mention`, `review_requested`, ...).
        reason: String,
        /// Subject type (`Issue`, `PullRequest`, `Release`, ...).
        subject_type: String,
    },
    /// A repository or user activity event.
    Event {
        /// Event type (`PushEvent`, `WatchEvent`, ...).
        event_type: String,
    },
}

impl Item {
    /// Whether this item is unread. Absent unread state counts as read.
    pub fn is_unread(&self) -> bool {
        self.unread.unwrap_or(false)
    }

    /// Whether this item is a notification.
    pub fn is_notification(&self) -> bool {
        matches!(self.payload, ItemPayload::Notification { .. })
    }

    /// Whether this item is an activity event.
    pub fn is_event(&self) -> bool {
        matches!(self.payload, ItemPayload::Event { .. })
    }
}
