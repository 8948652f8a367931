//! Filter pipeline: column rules over the unioned subscription items.
//!
//! The rules themselves are a strategy ([`FilterRules`]); [`DefaultRules`]
//! implements the built-in column filters. [`filter_items`] is the pure
//! function, [`FilterPipeline`] memoizes it per column so identical inputs
//! hand back the same output `Arc`.

use super::memo::{Memo, SharedRef};
use crate::model::{
    resolve_identity, ColumnFilters, ColumnType, Item, ItemKey, ItemPayload, PlanInfo,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Number of items kept by a column positioned beyond the columns limit.
pub const CAPPED_ITEM_LIMIT: usize = 10;

/// Session inputs the rules depend on besides the column itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterContext {
    /// Login of the signed-in user, for `hide_own_events`.
    pub logged_username: Option<String>,
    /// Collapse runs of similar items into one.
    pub merge_similar: bool,
    /// Plan of the signed-in user, for private items.
    pub plan: Option<PlanInfo>,
}

/// Strategy deciding which items a column shows and in what order.
pub trait FilterRules {
    /// Whether `item` passes the column's filters.
    fn accepts(
        &self,
        column_type: ColumnType,
        item: &Item,
        filters: &ColumnFilters,
        context: &FilterContext,
    ) -> bool;

    /// Display order. Must be a total order; ties keep input order.
    fn order(&self, a: &Item, b: &Item) -> Ordering;

    /// Whether two adjacent items may be merged into one.
    fn is_similar(&self, a: &Item, b: &Item) -> bool;
}

/// Built-in column filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRules;

impl FilterRules for DefaultRules {
    fn accepts(
        &self,
        column_type: ColumnType,
        item: &Item,
        filters: &ColumnFilters,
        context: &FilterContext,
    ) -> bool {
        let kind_matches = match column_type {
            ColumnType::Notifications => item.is_notification(),
            ColumnType::Activity => item.is_event(),
        };
        if !kind_matches {
            return false;
        }

        if let Some(cleared_at) = filters.cleared_at {
            if item.updated_at <= cleared_at {
                return false;
            }
        }

        if let Some(unread) = filters.unread {
            if item.is_unread() != unread {
                return false;
            }
        }

        if let Some(private) = filters.private {
            if item.is_private != private {
                return false;
            }
        }

        if item.is_private && !context.plan.as_ref().is_some_and(|p| p.allows_private) {
            return false;
        }

        match &item.payload {
            ItemPayload::Notification {
                reason,
                subject_type,
            } => filters.notifications.as_ref().map_or(true, |n| {
                n.reasons.allows(reason) && n.subject_types.allows(subject_type)
            }),
            ItemPayload::Event { event_type } => {
                let Some(activity) = &filters.activity else {
                    return true;
                };
                if !activity.types.allows(event_type) {
                    return false;
                }
                let hide_own = activity.hide_own_events.unwrap_or(false);
                !(hide_own
                    && item.actor.is_some()
                    && item.actor.as_deref() == context.logged_username.as_deref())
            }
        }
    }

    fn order(&self, a: &Item, b: &Item) -> Ordering {
        b.updated_at.cmp(&a.updated_at)
    }

    fn is_similar(&self, a: &Item, b: &Item) -> bool {
        if a.repo != b.repo {
            return false;
        }
        match (&a.payload, &b.payload) {
            (
                ItemPayload::Notification {
                    reason: ra,
                    subject_type: sa,
                },
                ItemPayload::Notification {
                    reason: rb,
                    subject_type: sb,
                },
            ) => ra == rb && sa == sb,
            (ItemPayload::Event { event_type: ta }, ItemPayload::Event { event_type: tb }) => {
                ta == tb && a.actor == b.actor
            }
            _ => false,
        }
    }
}

/// Apply `rules` to `items`.
///
/// Filters, sorts (stable), then merges runs of similar items when
/// `context.merge_similar` is set, and finally truncates to
/// [`CAPPED_ITEM_LIMIT`] when `capped`.
pub fn filter_items<R: FilterRules + ?Sized>(
    rules: &R,
    column_type: ColumnType,
    items: &[Arc<Item>],
    filters: &ColumnFilters,
    context: &FilterContext,
    capped: bool,
) -> Vec<Arc<Item>> {
    let mut runs = MergedRuns::default();
    filter_items_with_runs(
        rules,
        column_type,
        items,
        filters,
        context,
        capped,
        &mut runs,
    )
}

/// [`filter_items`], reusing the representatives of merged runs whose
/// members are the same references as in `runs`.
///
/// `runs` is replaced by the runs of this call.
fn filter_items_with_runs<R: FilterRules + ?Sized>(
    rules: &R,
    column_type: ColumnType,
    items: &[Arc<Item>],
    filters: &ColumnFilters,
    context: &FilterContext,
    capped: bool,
    runs: &mut MergedRuns,
) -> Vec<Arc<Item>> {
    let mut kept: Vec<Arc<Item>> = items
        .iter()
        .filter(|item| rules.accepts(column_type, item, filters, context))
        .cloned()
        .collect();

    kept.sort_by(|a, b| rules.order(a, b));

    if context.merge_similar {
        kept = merge_similar(rules, kept, runs);
    } else {
        runs.clear();
    }

    if capped {
        kept.truncate(CAPPED_ITEM_LIMIT);
    }
    kept
}

// ===== Merged runs =====

#[derive(Debug, Clone)]
struct MergedRun {
    members: Vec<Arc<Item>>,
    representative: Arc<Item>,
}

/// Representatives of the merged runs of one pass, keyed by the identity of
/// the run's first item.
#[derive(Debug, Clone, Default)]
pub struct MergedRuns(HashMap<ItemKey, MergedRun>);

impl MergedRuns {
    /// Number of merged runs remembered.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no merged run is remembered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    /// Previous representative of a run with exactly these members.
    fn reusable(&self, key: &ItemKey, members: &[Arc<Item>]) -> Option<Arc<Item>> {
        let run = self.0.get(key)?;
        let same = run.members.len() == members.len()
            && run
                .members
                .iter()
                .zip(members)
                .all(|(a, b)| Arc::ptr_eq(a, b));
        same.then(|| Arc::clone(&run.representative))
    }
}

/// Collapse consecutive similar items.
///
/// The first item of a run is the representative and keeps its identity; the
/// identities of the rest are appended to its `merged` list. A run of one is
/// passed through untouched.
fn merge_similar<R: FilterRules + ?Sized>(
    rules: &R,
    items: Vec<Arc<Item>>,
    runs: &mut MergedRuns,
) -> Vec<Arc<Item>> {
    let previous = std::mem::take(runs);
    let mut out: Vec<Arc<Item>> = Vec::with_capacity(items.len());
    let mut run: Vec<Arc<Item>> = Vec::new();

    for item in items {
        if let Some(head) = run.first() {
            if !rules.is_similar(head, &item) {
                out.push(collapse_run(std::mem::take(&mut run), &previous, runs));
            }
        }
        run.push(item);
    }
    if !run.is_empty() {
        out.push(collapse_run(run, &previous, runs));
    }
    out
}

fn collapse_run(
    mut run: Vec<Arc<Item>>,
    previous: &MergedRuns,
    next: &mut MergedRuns,
) -> Arc<Item> {
    if run.len() == 1 {
        return run.remove(0);
    }

    let key = resolve_identity(&run[0]);
    let representative = key
        .as_ref()
        .and_then(|key| previous.reusable(key, &run))
        .unwrap_or_else(|| {
            let mut representative = Item::clone(&run[0]);
            representative
                .merged
                .extend(run[1..].iter().filter_map(|item| resolve_identity(item)));
            Arc::new(representative)
        });

    if let Some(key) = key {
        next.0.insert(
            key,
            MergedRun {
                members: run,
                representative: Arc::clone(&representative),
            },
        );
    }
    representative
}

#[derive(Debug, Clone, PartialEq)]
struct FilterDeps {
    column_type: ColumnType,
    items: SharedRef<[Arc<Item>]>,
    filters: ColumnFilters,
    context: FilterContext,
    capped: bool,
}

/// Memoized filter for one column.
#[derive(Debug)]
pub struct FilterPipeline<R = DefaultRules> {
    rules: R,
    memo: Memo<FilterDeps, Arc<[Arc<Item>]>>,
    runs: MergedRuns,
    empty: Arc<[Arc<Item>]>,
}

impl Default for FilterPipeline<DefaultRules> {
    fn default() -> Self {
        Self::new(DefaultRules)
    }
}

impl<R: FilterRules> FilterPipeline<R> {
    /// Pipeline applying `rules`.
    pub fn new(rules: R) -> Self {
        Self {
            rules,
            memo: Memo::new(),
            runs: MergedRuns::default(),
            empty: Arc::from(Vec::new()),
        }
    }

    /// Merged runs of the last recompute.
    pub fn merged_runs(&self) -> &MergedRuns {
        &self.runs
    }

    /// The shared empty result.
    pub fn empty(&self) -> Arc<[Arc<Item>]> {
        Arc::clone(&self.empty)
    }

    /// Filter `items`, reusing the previous output when every input is the
    /// same as last time.
    pub fn run(
        &mut self,
        column_type: ColumnType,
        items: &Arc<[Arc<Item>]>,
        filters: &ColumnFilters,
        context: &FilterContext,
        capped: bool,
    ) -> Arc<[Arc<Item>]> {
        let deps = FilterDeps {
            column_type,
            items: SharedRef::new(items),
            filters: filters.clone(),
            context: context.clone(),
            capped,
        };

        let rules = &self.rules;
        let empty = &self.empty;
        let runs = &mut self.runs;
        let (output, fresh) = self.memo.get_or_compute(deps, |d| {
            let kept = filter_items_with_runs(
                rules,
                d.column_type,
                &d.items.0,
                &d.filters,
                &d.context,
                d.capped,
                runs,
            );
            if kept.is_empty() {
                Arc::clone(empty)
            } else {
                Arc::from(kept)
            }
        });

        if fresh {
            debug!(
                input = items.len(),
                output = output.len(),
                capped,
                "Recomputed filtered items"
            );
        }
        Arc::clone(output)
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
