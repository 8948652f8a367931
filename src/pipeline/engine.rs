//! Feed engine: the per-column views over one store.

use super::card::CardDescriptor;
use super::compose::{ColumnView, ListFrame, PageTriggers, VisibleCursor};
use super::filter::{DefaultRules, FilterRules};
use super::layout_cache::{CardLayout, DefaultCardLayout, LayoutRecord};
use super::settings::EngineSettings;
use crate::model::ColumnId;
use crate::source::SnapshotProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Owns a store and one [`ColumnView`] per column it was asked about.
pub struct FeedEngine<P, R = DefaultRules, L = DefaultCardLayout> {
    store: P,
    settings: EngineSettings,
    rules: R,
    layout: L,
    views: HashMap<ColumnId, ColumnView<R, L>>,
    triggers: HashMap<ColumnId, PageTriggers>,
}

impl<P: SnapshotProvider> FeedEngine<P, DefaultRules, DefaultCardLayout> {
    /// Engine with the default filter rules and card layout.
    pub fn new(store: P, settings: EngineSettings) -> Self {
        Self::with_strategies(store, settings, DefaultRules, DefaultCardLayout)
    }
}

impl<P, R, L> FeedEngine<P, R, L>
where
    P: SnapshotProvider,
    R: FilterRules + Clone,
    L: CardLayout + Clone,
{
    /// Engine with custom filter rules and card layout.
    pub fn with_strategies(store: P, settings: EngineSettings, rules: R, layout: L) -> Self {
        Self {
            store,
            settings,
            rules,
            layout,
            views: HashMap::new(),
            triggers: HashMap::new(),
        }
    }

    /// The store frames are derived from.
    pub fn store(&self) -> &P {
        &self.store
    }

    /// Mutable store access. Frames pick up the writes on their next pass.
    pub fn store_mut(&mut self) -> &mut P {
        &mut self.store
    }

    /// Current settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Replace the settings. Frames pick them up on their next pass.
    pub fn set_settings(&mut self, settings: EngineSettings) {
        self.settings = settings;
    }

    /// Register the pagination actions of a column.
    pub fn set_triggers(&mut self, column_id: &ColumnId, triggers: PageTriggers) {
        self.triggers.insert(column_id.clone(), triggers);
    }

    /// Compose the frame of a column.
    pub fn list_frame(&mut self, column_id: &ColumnId) -> Arc<ListFrame> {
        let triggers = self.triggers.get(column_id).cloned().unwrap_or_default();
        let (rules, layout) = (&self.rules, &self.layout);
        let view = self.views.entry(column_id.clone()).or_insert_with(|| {
            ColumnView::with_strategies(column_id.clone(), rules.clone(), layout.clone())
        });
        view.refresh(&self.store, &self.settings, &triggers)
    }

    /// Frames of every column in the store, in position order.
    pub fn frames(&mut self) -> Vec<Arc<ListFrame>> {
        let ids = self.store.column_ids();
        ids.iter().map(|id| self.list_frame(id)).collect()
    }

    /// Layout record of an item in a column's last frame.
    pub fn item_layout(&self, column_id: &ColumnId, index: usize) -> Option<LayoutRecord> {
        self.views.get(column_id)?.item_layout(index)
    }

    /// Card descriptor of an item in a column's last frame.
    pub fn card_descriptor(
        &self,
        column_id: &ColumnId,
        index: usize,
    ) -> Option<Arc<CardDescriptor>> {
        self.views.get(column_id)?.card_descriptor(index)
    }

    /// Index of the item covering `offset` in a column.
    pub fn index_at_offset(&self, column_id: &ColumnId, offset: u64) -> Option<usize> {
        self.views.get(column_id)?.index_at_offset(offset)
    }

    /// Visibility callback of the host.
    pub fn on_visible_range_changed(&mut self, column_id: &ColumnId, first_index: usize) {
        self.view_mut(column_id).on_visible_range_changed(first_index);
    }

    /// Handle on a column's first visible index.
    pub fn visible_cursor(&mut self, column_id: &ColumnId) -> VisibleCursor {
        self.view_mut(column_id).visible_cursor()
    }

    /// Drop the views of columns the store no longer has.
    pub fn prune(&mut self) -> usize {
        let before = self.views.len();
        let store = &self.store;
        self.views.retain(|id, _| store.column(id).is_some());
        self.triggers.retain(|id, _| store.column(id).is_some());
        let pruned = before - self.views.len();
        if pruned > 0 {
            debug!(pruned, "Dropped views of deleted columns");
        }
        pruned
    }

    fn view_mut(&mut self, column_id: &ColumnId) -> &mut ColumnView<R, L> {
        let (rules, layout) = (&self.rules, &self.layout);
        self.views.entry(column_id.clone()).or_insert_with(|| {
            ColumnView::with_strategies(column_id.clone(), rules.clone(), layout.clone())
        })
    }
}
