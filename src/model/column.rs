//! Columns and their filter specifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Column identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(String);

impl ColumnId {
    /// Wrap a raw id.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subscription identifier. A column unions the items of its subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Wrap a raw id.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of data a column shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Inbox notifications.
    Notifications,
    /// Activity events.
    Activity,
}

/// A named data view over one or more subscriptions.
///
/// The column's position among its siblings is owned by the store
/// (see [`crate::source::SnapshotProvider::column_index`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column identifier.
    pub id: ColumnId,
    /// Kind of data shown.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Display title. Falls back to the id when absent.
    #[serde(default)]
    pub title: Option<String>,
    /// Ordered subscriptions whose items are unioned.
    #[serde(default)]
    pub subscription_ids: Vec<SubscriptionId>,
    /// Filter rules applied to the unioned items.
    #[serde(default)]
    pub filters: ColumnFilters,
}

impl Column {
    /// Title to display in the column header.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(self.id.as_str())
    }

    /// Whether the column has any subscription to read from.
    pub fn has_subscriptions(&self) -> bool {
        !self.subscription_ids.is_empty()
    }
}

/// Per-column filter rules.
///
/// Every field is optional; an absent field does not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnFilters {
    /// `Some(true)`: only unread items. `Some(false)`: only read items.
    pub unread: Option<bool>,
    /// `Some(true)`: only private items. `Some(false)`: only public items.
    pub private: Option<bool>,
    /// Items last updated at or before this instant are hidden.
    pub cleared_at: Option<DateTime<Utc>>,
    /// Rules for notification columns.
    pub notifications: Option<NotificationFilters>,
    /// Rules for activity columns.
    pub activity: Option<ActivityFilters>,
}

/// Filters that only apply to notification columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationFilters {
    /// By notification reason.
    pub reasons: FilterRecord,
    /// By subject type.
    pub subject_types: FilterRecord,
}

/// Filters that only apply to activity columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityFilters {
    /// By event type.
    pub types: FilterRecord,
    /// Hide events performed by the logged-in user.
    pub hide_own_events: Option<bool>,
}

/// A value → enabled map, as edited by column option checkboxes.
///
/// If any value is mapped to `true` the record is *strict*: only values
/// mapped to `true` pass. Otherwise values mapped to `false` are excluded and
/// everything else passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterRecord(BTreeMap<String, bool>);

impl FilterRecord {
    /// Empty record: filters nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, value: impl Into<String>, enabled: bool) -> Self {
        self.0.insert(value.into(), enabled);
        self
    }

    /// Whether no value is mapped.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any value is explicitly enabled.
    pub fn is_strict(&self) -> bool {
        self.0.values().any(|enabled| *enabled)
    }

    /// Whether `value` passes this record.
    pub fn allows(&self, value: &str) -> bool {
        if self.is_strict() {
            self.0.get(value).copied().unwrap_or(false)
        } else {
            self.0.get(value).copied().unwrap_or(true)
        }
    }
}

/// Subscription plan of the logged-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanInfo {
    /// Plan name, for display only.
    pub name: String,
    /// Whether items from private repositories may be shown.
    pub allows_private: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_allows_everything() {
        let record = FilterRecord::new();
        assert!(!record.is_strict());
        assert!(record.allows("mention"));
    }

    #[test]
    fn non_strict_record_excludes_disabled_values() {
        let record = FilterRecord::new().with("subscribed", false);
        assert!(!record.is_strict());
        assert!(!record.allows("subscribed"));
        assert!(record.allows("mention"));
    }

    #[test]
    fn strict_record_only_allows_enabled_values() {
        let record = FilterRecord::new()
            .with("mention", true)
            .with("subscribed", false);
        assert!(record.is_strict());
        assert!(record.allows("mention"));
        assert!(!record.allows("subscribed"));
        assert!(!record.allows("assign"));
    }

    #[test]
    fn display_title_falls_back_to_id() {
        let column = Column {
            id: ColumnId::new("inbox"),
            column_type: ColumnType::Notifications,
            title: None,
            subscription_ids: vec![],
            filters: ColumnFilters::default(),
        };
        assert_eq!(column.display_title(), "inbox");
        assert!(!column.has_subscriptions());
    }

    #[test]
    fn column_deserializes_with_filters() {
        let json = r#"{
            "id": "inbox",
            "type": "notifications",
            "subscription_ids": ["s1", "s2"],
            "filters": {
                "unread": true,
                "cleared_at": "2025-06-01T12:00:00Z",
                "notifications": { "reasons": { "mention": true } }
            }
        }"#;

        let column: Column = serde_json::from_str(json).unwrap();

        assert_eq!(column.column_type, ColumnType::Notifications);
        assert_eq!(column.subscription_ids.len(), 2);
        assert_eq!(column.filters.unread, Some(true));
        assert!(column.filters.cleared_at.is_some());
        let reasons = &column.filters.notifications.as_ref().unwrap().reasons;
        assert!(reasons.allows("mention"));
        assert!(!reasons.allows("author"));
    }
}
