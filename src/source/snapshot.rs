//! JSON snapshot documents.
//!
//! A snapshot seeds a [`MemoryStore`] with columns, subscription items and
//! session info:
//!
//! ```json
//! {
//!   "logged_in_user": "octocat",
//!   "plan": { "name": "pro", "allows_private": true },
//!   "columns": [{ "id": "inbox", "type": "notifications", "subscription_ids": ["s1"] }],
//!   "subscriptions": { "s1": [{ "kind": "notification", "id": 1, "title": "..." }] },
//!   "last_fetched_at": { "s1": "2025-06-01T12:10:00Z" }
//! }
//! ```

use super::MemoryStore;
use crate::model::error::SnapshotError;
use crate::model::{Column, Item, PlanInfo, SubscriptionId};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Parsed snapshot document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Snapshot {
    /// Login of the signed-in user.
    pub logged_in_user: Option<String>,
    /// Plan of the signed-in user.
    pub plan: Option<PlanInfo>,
    /// Columns in display order.
    pub columns: Vec<Column>,
    /// Items per subscription.
    pub subscriptions: BTreeMap<SubscriptionId, Vec<Item>>,
    /// Completed fetch time per subscription.
    pub last_fetched_at: BTreeMap<SubscriptionId, DateTime<Utc>>,
}

impl Snapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Build a store holding this snapshot's data.
    pub fn into_store(self) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.set_logged_in_user(self.logged_in_user);
        store.set_plan(self.plan);
        for column in self.columns {
            store.put_column(column);
        }
        for (subscription, at) in &self.last_fetched_at {
            store.set_last_fetched_at(subscription, *at);
        }
        for (subscription, items) in self.subscriptions {
            for item in items {
                store.upsert(&subscription, item);
            }
        }
        store
    }
}

/// Load a snapshot file into a fresh store.
///
/// # Errors
///
/// Returns `SnapshotError::FileNotFound` if the file does not exist,
/// `SnapshotError::Parse` if it is not a valid snapshot document and
/// `SnapshotError::Io` for other I/O errors.
pub fn load_snapshot(path: &Path) -> Result<MemoryStore, SnapshotError> {
    if !path.exists() {
        return Err(SnapshotError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let text = std::fs::read_to_string(path)?;
    let snapshot = Snapshot::from_json(&text).map_err(|e| SnapshotError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    info!(
        path = %path.display(),
        columns = snapshot.columns.len(),
        subscriptions = snapshot.subscriptions.len(),
        "Loaded snapshot"
    );
    Ok(snapshot.into_store())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnId, ItemKey, SubscriptionId};
    use crate::source::SnapshotProvider;
    use std::path::PathBuf;

    const SNAPSHOT: &str = r#"{
        "logged_in_user": "octocat",
        "plan": { "name": "pro", "allows_private": true },
        "columns": [
            { "id": "inbox", "type": "notifications", "subscription_ids": ["s1"] },
            { "id": "feed", "type": "activity", "subscription_ids": ["s2"] }
        ],
        "subscriptions": {
            "s1": [
                { "kind": "notification", "id": 1, "title": "Fix the build",
                  "reason": "mention", "subject_type": "Issue",
                  "updated_at": "2025-06-01T12:00:00Z" }
            ],
            "s2": [
                { "kind": "event", "node_id": "E_1", "title": "pushed",
                  "actor": "hubot", "event_type": "PushEvent",
                  "updated_at": "2025-06-01T12:05:00Z" }
            ]
        },
        "last_fetched_at": { "s1": "2025-06-01T12:10:00Z" }
    }"#;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("colfeed-{}-{}", std::process::id(), name))
    }

    #[test]
    fn snapshot_populates_store() {
        let store = Snapshot::from_json(SNAPSHOT).unwrap().into_store();

        assert_eq!(store.logged_in_user().as_deref(), Some("octocat"));
        assert_eq!(store.column_index(&ColumnId::new("feed")), Some(1));
        assert!(store.item_by_key(&ItemKey::new("1").unwrap()).is_some());
        assert!(store.item_by_key(&ItemKey::new("E_1").unwrap()).is_some());
        assert_eq!(
            store.last_fetched_at(&[SubscriptionId::new("s1")]),
            "2025-06-01T12:10:00Z".parse::<DateTime<Utc>>().ok()
        );
        assert_eq!(store.last_fetched_at(&[SubscriptionId::new("s2")]), None);
    }

    #[test]
    fn unusable_item_ids_do_not_fail_the_snapshot() {
        // GIVEN one item with a negative id and one with a float id
        let json = r#"{
            "columns": [{ "id": "inbox", "type": "notifications", "subscription_ids": ["s1"] }],
            "subscriptions": {
                "s1": [
                    { "kind": "notification", "id": -1, "title": "negative",
                      "reason": "mention", "subject_type": "Issue",
                      "updated_at": "2025-06-01T12:00:00Z" },
                    { "kind": "notification", "id": 2.5, "title": "float",
                      "reason": "mention", "subject_type": "Issue",
                      "updated_at": "2025-06-01T12:01:00Z" },
                    { "kind": "notification", "id": 3, "title": "plain",
                      "reason": "mention", "subject_type": "Issue",
                      "updated_at": "2025-06-01T12:02:00Z" }
                ]
            }
        }"#;

        // WHEN it is loaded
        let store = Snapshot::from_json(json).unwrap().into_store();

        // THEN the snapshot loads and every usable id resolves
        assert!(store.item_by_key(&ItemKey::new("-1").unwrap()).is_some());
        assert!(store.item_by_key(&ItemKey::new("3").unwrap()).is_some());
        assert_eq!(store.items_for_subscriptions(&[SubscriptionId::new("s1")]).len(), 3);
    }

    #[test]
    fn unknown_top_level_field_is_rejected() {
        let result = Snapshot::from_json(r#"{ "colums": [] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn load_missing_file_is_file_not_found() {
        let err = load_snapshot(Path::new("/nonexistent/colfeed/snapshot.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::FileNotFound { .. }));
    }

    #[test]
    fn load_invalid_json_is_parse_error() {
        let path = temp_path("invalid-snapshot.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_snapshot(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);

        match err {
            SnapshotError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn load_valid_file() {
        let path = temp_path("valid-snapshot.json");
        std::fs::write(&path, SNAPSHOT).unwrap();

        let store = load_snapshot(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(store.unwrap().column_ids().len(), 2);
    }
}
