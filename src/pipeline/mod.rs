//! Incremental data-to-layout pipeline.
//!
//! # Stages
//!
//! 1. [`filter`]: column rules over the unioned subscription items
//! 2. [`change`]: reference comparison over the visible identities
//! 3. [`layout_cache`]: identity-keyed card descriptors, sizes and offsets
//! 4. [`compose`]: header, footer, records and override into a [`ListFrame`]
//!
//! Every stage is a [`memo::Memo`] cell whose dependencies compare by value
//! or by `Arc` address. A pass runs the stages in order and recomputes only
//! those whose dependencies changed.

pub mod card;
pub mod change;
pub mod compose;
pub mod engine;
pub mod filter;
pub mod layout_cache;
pub mod memo;
pub mod offset_index;
pub mod settings;

pub use card::{card_size, derive_card, CardDescriptor, CardKind, CardOptions};
pub use change::{has_changed, ChangeDetector};
pub use compose::{
    ColumnView, FooterSpec, FooterState, HeaderSpec, ListFrame, OverrideState, PageTriggers,
    RefreshSpec, Trigger, VisibleCursor, NEVER_FETCHED_TITLE,
};
pub use engine::FeedEngine;
pub use filter::{
    filter_items, DefaultRules, FilterContext, FilterPipeline, FilterRules, MergedRuns,
    CAPPED_ITEM_LIMIT,
};
pub use layout_cache::{
    layout_records, CardLayout, DefaultCardLayout, LayoutCache, LayoutParams, LayoutPass,
    LayoutRecord,
};
pub use memo::{Memo, SharedRef, VersionToken};
pub use offset_index::OffsetIndex;
pub use settings::{EngineSettings, SizingConfig};
