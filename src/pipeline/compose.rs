//! List composition: one column's complete render contract.
//!
//! [`ColumnView`] owns every cross-pass cache of a column and runs the pass
//! top to bottom: items → filter → identities → change detection → layout →
//! [`ListFrame`]. Each stage is a memo cell, so a pass over unchanged inputs
//! hands back the previous frame `Arc`.

use super::card::CardDescriptor;
use super::change::ChangeDetector;
use super::filter::{DefaultRules, FilterContext, FilterPipeline, FilterRules};
use super::layout_cache::{
    CardLayout, DefaultCardLayout, LayoutCache, LayoutParams, LayoutPass, LayoutRecord,
};
use super::memo::{Memo, SharedRef, VersionToken};
use super::settings::{EngineSettings, SizingConfig};
use crate::model::{identity_keys, Column, ColumnId, Item, ItemKey};
use crate::source::SnapshotProvider;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Title of the column-limit override.
pub const COLUMN_LIMIT_TITLE: &str = "Too many columns";

/// Refresh control title of a column that was never fetched.
pub const NEVER_FETCHED_TITLE: &str = "Pull to refresh";

// ===== Triggers =====

/// Externally owned action threaded through to the host.
///
/// The pipeline never invokes triggers. Two triggers are equal when they
/// share the same closure.
#[derive(Clone)]
pub struct Trigger(Arc<dyn Fn() + Send + Sync>);

impl Trigger {
    /// Wrap `action`.
    pub fn new<F>(action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(action))
    }

    /// Run the action.
    pub fn fire(&self) {
        (self.0)()
    }
}

impl PartialEq for Trigger {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Trigger(..)")
    }
}

/// Pagination actions of a column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageTriggers {
    /// Present while more pages can be fetched.
    pub fetch_next_page: Option<Trigger>,
    /// Reload the column from scratch.
    pub refresh: Option<Trigger>,
}

// ===== Visible cursor =====

/// Index of the first visible item, shared with the host.
///
/// Updated by the host's visibility callback and read by the keyboard
/// subscriber. It is not a pass input, so updating it never rebuilds.
#[derive(Debug, Clone, Default)]
pub struct VisibleCursor(Rc<Cell<Option<usize>>>);

impl VisibleCursor {
    /// Cursor with no visible item yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first visible item, if reported.
    pub fn get(&self) -> Option<usize> {
        self.0.get()
    }

    /// Record the first visible item.
    pub fn set(&self, first_index: usize) {
        self.0.set(Some(first_index));
    }

    /// Forget the reported position.
    pub fn clear(&self) {
        self.0.set(None);
    }
}

// ===== Frame =====

/// Sticky header above the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderSpec {
    /// Height in rows.
    pub size: u32,
    /// Always `true`.
    pub sticky: bool,
}

/// What the footer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FooterState {
    /// The column was cleared and nothing newer arrived.
    Cleared,
    /// Nothing to show.
    Empty,
    /// More pages can be fetched.
    LoadMore,
    /// End of the list.
    End,
}

/// Footer below the list. Never sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FooterSpec {
    /// What the footer shows.
    pub state: FooterState,
    /// Height in rows; 0 at the end of the list.
    pub size: u32,
    /// Always `false`.
    pub sticky: bool,
}

impl FooterSpec {
    /// Footer for the given list state.
    pub fn new(sizing: &SizingConfig, is_empty: bool, has_next_page: bool, cleared: bool) -> Self {
        let (state, size) = if is_empty && cleared {
            (FooterState::Cleared, sizing.footer_cleared)
        } else if is_empty {
            (FooterState::Empty, sizing.footer_empty)
        } else if has_next_page {
            (FooterState::LoadMore, sizing.footer_load_more)
        } else {
            (FooterState::End, 0)
        };
        Self {
            state,
            size,
            sticky: false,
        }
    }
}

/// Pull-to-refresh affordance above the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshSpec {
    /// `Last updated <date>`, or [`NEVER_FETCHED_TITLE`].
    pub title: String,
    /// When the column's data was last fetched.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl RefreshSpec {
    /// Refresh control for data last fetched at `last_fetched_at`.
    pub fn new(last_fetched_at: Option<DateTime<Utc>>) -> Self {
        let title = match last_fetched_at {
            Some(at) => format!("Last updated {}", at.format("%b %d %H:%M")),
            None => NEVER_FETCHED_TITLE.to_string(),
        };
        Self {
            title,
            last_fetched_at,
        }
    }
}

/// Full replacement of a column's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideState {
    /// The column sits beyond the columns limit.
    ColumnLimitReached {
        /// Configured columns limit.
        limit: usize,
        /// Short title.
        title: String,
        /// Explanation shown instead of the list.
        message: String,
    },
}

impl OverrideState {
    /// Override of a column beyond `limit`.
    pub fn column_limit_reached(limit: usize) -> Self {
        Self::ColumnLimitReached {
            limit,
            title: COLUMN_LIMIT_TITLE.to_string(),
            message: format!(
                "You have reached the limit of {limit} columns. \
                 This is to maintain a healthy usage of the GitHub API."
            ),
        }
    }
}

/// Complete render contract of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ListFrame {
    /// Column this frame renders.
    pub column_id: ColumnId,
    /// Column title, or its id when the column is gone.
    pub title: String,
    /// Sticky header.
    pub header: HeaderSpec,
    /// Footer after the last item.
    pub footer: FooterSpec,
    /// Gap after every item.
    pub separator: u32,
    /// Filtered items, in display order.
    pub items: Arc<[Arc<Item>]>,
    /// One descriptor per item; `None` where derivation failed.
    pub descriptors: Arc<[Option<Arc<CardDescriptor>>]>,
    /// One record per item; empty while overridden.
    pub records: Arc<[LayoutRecord]>,
    /// Replaces the list when set.
    pub override_state: Option<OverrideState>,
    /// Advances whenever a visible item was replaced.
    pub data_version: VersionToken,
    /// Empty while overridden.
    pub triggers: PageTriggers,
    /// `None` while overridden.
    pub refresh_control: Option<RefreshSpec>,
}

impl ListFrame {
    /// Whether the column has no items to show.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total list extent: header, items with separators, footer.
    pub fn content_size(&self) -> u64 {
        let items: u64 = self
            .records
            .last()
            .map(|r| r.offset + u64::from(r.length) + u64::from(self.separator))
            .unwrap_or(0);
        u64::from(self.header.size) + items + u64::from(self.footer.size)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FrameDeps {
    title: String,
    header: HeaderSpec,
    footer: FooterSpec,
    separator: u32,
    items: SharedRef<[Arc<Item>]>,
    descriptors: SharedRef<[Option<Arc<CardDescriptor>>]>,
    records: SharedRef<[LayoutRecord]>,
    override_state: Option<OverrideState>,
    data_version: VersionToken,
    triggers: PageTriggers,
    refresh_control: Option<RefreshSpec>,
}

#[derive(Debug, Clone, PartialEq)]
struct LayoutDeps {
    items: SharedRef<[Arc<Item>]>,
    params: LayoutParams,
}

// ===== Column view =====

/// Cross-pass state of one column.
pub struct ColumnView<R = DefaultRules, L = DefaultCardLayout> {
    column_id: ColumnId,
    filter: FilterPipeline<R>,
    ids: Memo<SharedRef<[Arc<Item>]>, Arc<[ItemKey]>>,
    change: ChangeDetector,
    layout: LayoutCache<L>,
    layout_pass: Memo<LayoutDeps, LayoutPass>,
    frame: Memo<FrameDeps, Arc<ListFrame>>,
    cursor: VisibleCursor,
}

impl ColumnView<DefaultRules, DefaultCardLayout> {
    /// View with the built-in rules and card layout.
    pub fn new(column_id: ColumnId) -> Self {
        Self::with_strategies(column_id, DefaultRules, DefaultCardLayout)
    }
}

impl<R: FilterRules, L: CardLayout> ColumnView<R, L> {
    /// View with custom filter rules and card layout.
    pub fn with_strategies(column_id: ColumnId, rules: R, layout: L) -> Self {
        Self {
            column_id,
            filter: FilterPipeline::new(rules),
            ids: Memo::new(),
            change: ChangeDetector::new(),
            layout: LayoutCache::with_layout(layout),
            layout_pass: Memo::new(),
            frame: Memo::new(),
            cursor: VisibleCursor::new(),
        }
    }

    /// Column this view composes.
    pub fn column_id(&self) -> &ColumnId {
        &self.column_id
    }

    /// Run one pass against the store and return the column's frame.
    ///
    /// Returns the previous frame `Arc` when nothing the frame depends on
    /// changed.
    pub fn refresh<P>(
        &mut self,
        store: &P,
        settings: &EngineSettings,
        triggers: &PageTriggers,
    ) -> Arc<ListFrame>
    where
        P: SnapshotProvider + ?Sized,
    {
        let column = store.column(&self.column_id);
        let index = store.column_index(&self.column_id);
        let over_limit = index.is_some_and(|i| settings.is_over_limit(i));

        let items = match &column {
            Some(column) if column.has_subscriptions() => {
                let all = store.items_for_subscriptions(&column.subscription_ids);
                let context = FilterContext {
                    logged_username: store.logged_in_user(),
                    merge_similar: settings.merge_similar,
                    plan: store.plan(),
                };
                self.filter.run(
                    column.column_type,
                    &all,
                    &column.filters,
                    &context,
                    over_limit,
                )
            }
            _ => self.filter.empty(),
        };

        let ids = self.visible_ids(&items);
        let data_version = self.change.observe(&ids, &store.data_by_key());

        let params = LayoutParams {
            width: settings.card_width,
            options: settings.card_options,
            separator: settings.sizing.separator,
        };
        let (descriptors, records) = if over_limit {
            self.layout.reset();
            self.layout_pass.invalidate();
            (
                SharedRef(Arc::from(Vec::new())),
                SharedRef(Arc::from(Vec::new())),
            )
        } else {
            let layout = &mut self.layout;
            let deps = LayoutDeps {
                items: SharedRef::new(&items),
                params,
            };
            let (pass, _) = self
                .layout_pass
                .get_or_compute(deps, |d| layout.derive_layout(&d.items.0, &d.params));
            (
                SharedRef::new(&pass.descriptors),
                SharedRef::new(&pass.records),
            )
        };

        let last_fetched_at = column
            .as_ref()
            .and_then(|c| store.last_fetched_at(&c.subscription_ids));
        let deps = self.frame_deps(
            column.as_deref(),
            last_fetched_at,
            settings,
            triggers,
            over_limit,
            &items,
            descriptors,
            records,
            data_version,
        );
        let column_id = &self.column_id;
        let (frame, _) = self.frame.get_or_compute(deps, |d| {
            Arc::new(ListFrame {
                column_id: column_id.clone(),
                title: d.title.clone(),
                header: d.header,
                footer: d.footer,
                separator: d.separator,
                items: Arc::clone(&d.items.0),
                descriptors: Arc::clone(&d.descriptors.0),
                records: Arc::clone(&d.records.0),
                override_state: d.override_state.clone(),
                data_version: d.data_version,
                triggers: d.triggers.clone(),
                refresh_control: d.refresh_control.clone(),
            })
        });
        Arc::clone(frame)
    }

    /// Identities of the visible items, stable while their content is.
    fn visible_ids(&mut self, items: &Arc<[Arc<Item>]>) -> Arc<[ItemKey]> {
        let previous = self.ids.value().cloned();
        let (ids, _) = self.ids.get_or_compute(SharedRef::new(items), |d| {
            let keys = identity_keys(d.0.iter());
            match previous {
                Some(previous) if *previous == *keys => previous,
                _ => Arc::from(keys),
            }
        });
        Arc::clone(ids)
    }

    #[allow(clippy::too_many_arguments)]
    fn frame_deps(
        &self,
        column: Option<&Column>,
        last_fetched_at: Option<DateTime<Utc>>,
        settings: &EngineSettings,
        triggers: &PageTriggers,
        over_limit: bool,
        items: &Arc<[Arc<Item>]>,
        descriptors: SharedRef<[Option<Arc<CardDescriptor>>]>,
        records: SharedRef<[LayoutRecord]>,
        data_version: VersionToken,
    ) -> FrameDeps {
        let cleared = column.is_some_and(|c| c.filters.cleared_at.is_some());
        let triggers = if over_limit {
            PageTriggers::default()
        } else {
            triggers.clone()
        };
        let sizing = &settings.sizing;

        FrameDeps {
            title: column
                .map(|c| c.display_title().to_string())
                .unwrap_or_else(|| self.column_id.to_string()),
            header: HeaderSpec {
                size: sizing.header_size(),
                sticky: true,
            },
            footer: FooterSpec::new(
                sizing,
                items.is_empty(),
                triggers.fetch_next_page.is_some(),
                cleared,
            ),
            separator: sizing.separator,
            items: SharedRef::new(items),
            descriptors,
            records,
            override_state: over_limit
                .then(|| OverrideState::column_limit_reached(settings.columns_limit)),
            data_version,
            triggers,
            refresh_control: (!over_limit).then(|| RefreshSpec::new(last_fetched_at)),
        }
    }

    /// Last composed frame.
    pub fn frame(&self) -> Option<Arc<ListFrame>> {
        self.frame.value().cloned()
    }

    /// Layout record of the item at `index` in the last frame.
    pub fn item_layout(&self, index: usize) -> Option<LayoutRecord> {
        self.frame
            .value()
            .and_then(|frame| frame.records.get(index).copied())
    }

    /// Card descriptor of the item at `index` in the last frame.
    pub fn card_descriptor(&self, index: usize) -> Option<Arc<CardDescriptor>> {
        self.frame
            .value()
            .and_then(|frame| frame.descriptors.get(index).cloned().flatten())
    }

    /// Index of the item covering `offset`, measured from the first item.
    pub fn index_at_offset(&self, offset: u64) -> Option<usize> {
        self.layout.index_at_offset(offset)
    }

    /// Visibility callback of the host.
    pub fn on_visible_range_changed(&self, first_index: usize) {
        self.cursor.set(first_index);
    }

    /// Handle on the first visible index.
    pub fn visible_cursor(&self) -> VisibleCursor {
        self.cursor.clone()
    }

    /// Change version of the last pass.
    pub fn data_version(&self) -> VersionToken {
        self.change.version()
    }
}
