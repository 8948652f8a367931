//! Change detection over the visible identities.
//!
//! Items are compared by reference: the store replaces an item's `Arc`
//! whenever its payload changes, so one pointer comparison per visible slot
//! tells whether anything the column shows was updated.

use super::memo::{Memo, SharedRef, VersionToken};
use crate::model::ItemKey;
use crate::source::DataById;
use std::sync::Arc;
use tracing::debug;

/// Whether any of `ids` refers to a different item in `current` than in
/// `previous`.
///
/// An id missing from `previous` counts as changed. An id missing from both
/// snapshots does not.
pub fn has_changed(ids: &[ItemKey], current: &DataById, previous: Option<&DataById>) -> bool {
    let Some(previous) = previous else {
        return !ids.is_empty();
    };
    ids.iter().any(|id| match (current.get(id), previous.get(id)) {
        (Some(now), Some(before)) => !Arc::ptr_eq(now, before),
        (None, None) => false,
        _ => true,
    })
}

#[derive(Debug, Clone, PartialEq)]
struct ChangeDeps {
    ids: SharedRef<[ItemKey]>,
    data: SharedRef<DataById>,
}

/// Tracks the data snapshot between passes and counts detected changes.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    memo: Memo<ChangeDeps, ()>,
    previous: Option<Arc<DataById>>,
    version: VersionToken,
}

impl ChangeDetector {
    /// A detector that has observed nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the visible identities against the last observed snapshot.
    ///
    /// Re-evaluates only when the identity list or the data snapshot is a
    /// different reference than last time. Returns the change version, which
    /// advances by exactly one per evaluation that detected a change.
    pub fn observe(&mut self, ids: &Arc<[ItemKey]>, data: &Arc<DataById>) -> VersionToken {
        let deps = ChangeDeps {
            ids: SharedRef::new(ids),
            data: SharedRef::new(data),
        };

        let previous = &mut self.previous;
        let version = &mut self.version;
        self.memo.get_or_compute(deps, |d| {
            if has_changed(&d.ids.0, &d.data.0, previous.as_deref()) {
                *version = version.next();
                debug!(version = %version, visible = d.ids.0.len(), "Visible items changed");
            }
            *previous = Some(Arc::clone(&d.data.0));
        });

        self.version
    }

    /// Current change version.
    pub fn version(&self) -> VersionToken {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::test_support::notification;
    use crate::model::Item;
    use proptest::prelude::*;

    fn key(id: u64) -> ItemKey {
        ItemKey::new(id.to_string()).unwrap()
    }

    fn data(items: &[(u64, &Arc<Item>)]) -> Arc<DataById> {
        Arc::new(
            items
                .iter()
                .map(|(id, item)| (key(*id), Arc::clone(item)))
                .collect(),
        )
    }

    fn ids(list: &[u64]) -> Arc<[ItemKey]> {
        list.iter().map(|id| key(*id)).collect::<Vec<_>>().into()
    }

    #[test]
    fn same_references_are_unchanged() {
        let a = Arc::new(notification(1, "a"));
        let snapshot = data(&[(1, &a)]);
        let again = data(&[(1, &a)]);

        assert!(!has_changed(&[key(1)], &again, Some(&snapshot)));
    }

    #[test]
    fn replaced_reference_is_changed() {
        let a = Arc::new(notification(1, "a"));
        let a2 = Arc::new(notification(1, "a"));

        assert!(has_changed(
            &[key(1)],
            &data(&[(1, &a2)]),
            Some(&data(&[(1, &a)]))
        ));
    }

    #[test]
    fn key_missing_from_previous_is_changed() {
        let a = Arc::new(notification(1, "a"));
        let b = Arc::new(notification(2, "b"));

        assert!(has_changed(
            &[key(1), key(2)],
            &data(&[(1, &a), (2, &b)]),
            Some(&data(&[(1, &a)]))
        ));
    }

    #[test]
    fn changes_outside_visible_ids_are_ignored() {
        let a = Arc::new(notification(1, "a"));
        let b = Arc::new(notification(2, "b"));
        let b2 = Arc::new(notification(2, "b"));

        assert!(!has_changed(
            &[key(1)],
            &data(&[(1, &a), (2, &b2)]),
            Some(&data(&[(1, &a), (2, &b)]))
        ));
    }

    #[test]
    fn empty_ids_on_first_pass_are_unchanged() {
        assert!(!has_changed(&[], &DataById::new(), None));
    }

    #[test]
    fn detector_increments_once_per_changed_pass() {
        let mut detector = ChangeDetector::new();
        let a = Arc::new(notification(1, "a"));
        let visible = ids(&[1]);

        let snapshot = data(&[(1, &a)]);
        assert_eq!(detector.observe(&visible, &snapshot).get(), 1);

        // Same references: not re-evaluated
        assert_eq!(detector.observe(&visible, &snapshot).get(), 1);

        // New snapshot, same item reference: evaluated, no change
        let same_item = data(&[(1, &a)]);
        assert_eq!(detector.observe(&visible, &same_item).get(), 1);

        let a2 = Arc::new(notification(1, "a, edited"));
        let edited = data(&[(1, &a2)]);
        assert_eq!(detector.observe(&visible, &edited).get(), 2);
    }

    #[test]
    fn detector_starts_at_initial_for_empty_column() {
        let mut detector = ChangeDetector::new();
        let version = detector.observe(&ids(&[]), &Arc::new(DataById::new()));
        assert_eq!(version, VersionToken::INITIAL);
    }

    proptest! {
        #[test]
        fn prop_version_counts_replacements(edits in prop::collection::vec(any::<bool>(), 1..30)) {
            let mut detector = ChangeDetector::new();
            let visible = ids(&[1]);
            let mut current = Arc::new(notification(1, "a"));
            detector.observe(&visible, &data(&[(1, &current)]));

            let mut expected = 1u64;
            for replace in edits {
                if replace {
                    current = Arc::new(notification(1, "a"));
                    expected += 1;
                }
                let version = detector.observe(&visible, &data(&[(1, &current)]));
                prop_assert_eq!(version.get(), expected);
            }
        }
    }
}
