//! Tunables shared by every column pass.

use super::card::CardOptions;
use serde::{Deserialize, Serialize};

/// Default maximum number of fully served columns.
pub const DEFAULT_COLUMNS_LIMIT: usize = 10;

/// Default card width in cells.
pub const DEFAULT_CARD_WIDTH: u16 = 40;

/// Fixed element sizes, in rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizingConfig {
    /// Gap after every card.
    pub separator: u32,
    /// Search bar on top of each column.
    pub search_header: u32,
    /// Loading indicator below the search bar.
    pub loading_indicator: u32,
    /// Footer offering the next page.
    pub footer_load_more: u32,
    /// Footer of a column with nothing to show.
    pub footer_empty: u32,
    /// Footer of a cleared column with nothing left to show.
    pub footer_cleared: u32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            separator: 1,
            search_header: 3,
            loading_indicator: 1,
            footer_load_more: 3,
            footer_empty: 5,
            footer_cleared: 5,
        }
    }
}

impl SizingConfig {
    /// Height of the sticky header.
    pub fn header_size(&self) -> u32 {
        self.search_header.saturating_add(self.loading_indicator)
    }
}

/// Settings every [`ColumnView`](super::compose::ColumnView) pass reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Columns at or beyond this position are capped and overridden.
    pub columns_limit: usize,
    /// Collapse runs of similar items.
    pub merge_similar: bool,
    /// Width available to card text.
    pub card_width: u16,
    /// Context passed to card derivation.
    pub card_options: CardOptions,
    /// Row sizes of the list chrome.
    pub sizing: SizingConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            columns_limit: DEFAULT_COLUMNS_LIMIT,
            merge_similar: false,
            card_width: DEFAULT_CARD_WIDTH,
            card_options: CardOptions::default(),
            sizing: SizingConfig::default(),
        }
    }
}

impl EngineSettings {
    /// Whether a column at `index` is beyond the columns limit.
    pub fn is_over_limit(&self, index: usize) -> bool {
        index >= self.columns_limit
    }
}
