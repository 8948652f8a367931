//! colfeed
//!
//! Incremental filtering and layout caching for virtualized feed columns.
//!
//! Each column runs a pass of memoized stages over the data store: filter,
//! change detection, per-item card layout and list composition. Stable
//! inputs produce the same output `Arc`s, so a host re-rendering on every
//! store change only pays for what actually changed.
//!
//! The crate follows a Pure Core / Impure Shell split: `model`, `pipeline`
//! and `state` are pure; `source`, `view`, `config` and `logging` touch the
//! outside world.

pub mod config;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod state;
pub mod view;
