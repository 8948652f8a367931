//! JSONL update streams.
//!
//! Each non-blank line is one update:
//!
//! ```text
//! {"op":"upsert","subscription":"s1","item":{"kind":"notification","id":7,...}}
//! {"op":"remove","key":"7"}
//! ```
//!
//! Malformed lines are reported as [`UpdateError`]s alongside the updates
//! that did parse; they never abort the stream.

use crate::model::error::{SnapshotError, UpdateError};
use crate::model::{resolve_identity, Item, ItemKey, SubscriptionId};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// One change to apply to a store.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemUpdate {
    /// Insert or replace an item in a subscription.
    Upsert {
        /// Subscription receiving the item.
        subscription: SubscriptionId,
        /// The new item.
        item: Item,
    },
    /// Remove an item by identity.
    Remove {
        /// Identity of the removed item.
        key: ItemKey,
    },
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
enum RawUpdate {
    Upsert {
        subscription: SubscriptionId,
        item: Item,
    },
    Remove {
        key: String,
    },
}

fn parse_line(line: &str, line_number: usize) -> Result<ItemUpdate, UpdateError> {
    let raw: RawUpdate = serde_json::from_str(line).map_err(|e| UpdateError::InvalidJson {
        line: line_number,
        message: e.to_string(),
    })?;

    match raw {
        RawUpdate::Upsert { subscription, item } => {
            if resolve_identity(&item).is_none() {
                return Err(UpdateError::MissingIdentity { line: line_number });
            }
            Ok(ItemUpdate::Upsert { subscription, item })
        }
        RawUpdate::Remove { key } => ItemKey::new(key)
            .map(|key| ItemUpdate::Remove { key })
            .map_err(|_| UpdateError::MissingIdentity { line: line_number }),
    }
}

/// Parse a JSONL update stream.
///
/// Returns the parsed updates in stream order and the errors of the lines
/// that failed. Blank lines are skipped.
pub fn parse_updates(text: &str) -> (Vec<ItemUpdate>, Vec<UpdateError>) {
    let mut updates = Vec::new();
    let mut errors = Vec::new();

    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line, i + 1) {
            Ok(update) => updates.push(update),
            Err(e) => {
                warn!(error = %e, "Skipping malformed update");
                errors.push(e);
            }
        }
    }

    (updates, errors)
}

/// Read and parse an update file.
///
/// # Errors
///
/// Returns `SnapshotError::FileNotFound` if the file does not exist and
/// `SnapshotError::Io` if it cannot be read. Malformed lines are not errors.
pub fn load_updates(path: &Path) -> Result<(Vec<ItemUpdate>, Vec<UpdateError>), SnapshotError> {
    if !path.exists() {
        return Err(SnapshotError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path)?;
    Ok(parse_updates(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPSERT: &str = r#"{"op":"upsert","subscription":"s1","item":{"kind":"notification","id":7,"title":"New","reason":"mention","subject_type":"Issue","updated_at":"2025-06-01T12:00:00Z"}}"#;

    #[test]
    fn parses_upserts_and_removals() {
        let text = format!("{UPSERT}\n\n{{\"op\":\"remove\",\"key\":\"7\"}}\n");

        let (updates, errors) = parse_updates(&text);

        assert!(errors.is_empty());
        assert_eq!(updates.len(), 2);
        assert!(matches!(&updates[0], ItemUpdate::Upsert { subscription, .. } if subscription.as_str() == "s1"));
        assert_eq!(
            updates[1],
            ItemUpdate::Remove {
                key: ItemKey::new("7").unwrap()
            }
        );
    }

    #[test]
    fn malformed_lines_are_reported_and_skipped() {
        let text = format!("not json\n{UPSERT}\n{{\"op\":\"explode\"}}\n");

        let (updates, errors) = parse_updates(&text);

        assert_eq!(updates.len(), 1);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], UpdateError::InvalidJson { line: 1, .. }));
        assert!(matches!(errors[1], UpdateError::InvalidJson { line: 3, .. }));
    }

    #[test]
    fn upsert_without_identity_is_rejected() {
        let line = r#"{"op":"upsert","subscription":"s1","item":{"kind":"event","title":"x","event_type":"PushEvent","updated_at":"2025-06-01T12:00:00Z"}}"#;

        let (updates, errors) = parse_updates(line);

        assert!(updates.is_empty());
        assert_eq!(errors, vec![UpdateError::MissingIdentity { line: 1 }]);
    }

    #[test]
    fn blank_removal_key_is_rejected() {
        let (_, errors) = parse_updates(r#"{"op":"remove","key":"  "}"#);
        assert_eq!(errors, vec![UpdateError::MissingIdentity { line: 1 }]);
    }

    #[test]
    fn load_missing_update_file() {
        let err = load_updates(Path::new("/nonexistent/colfeed/updates.jsonl")).unwrap_err();
        assert!(matches!(err, SnapshotError::FileNotFound { .. }));
    }
}
