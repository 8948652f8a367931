//! Layout dimension constants for TUI rendering.

/// Height of the status bar in lines.
pub const STATUS_BAR_HEIGHT: u16 = 1;

/// Rows taken by a column's top and bottom borders.
pub const COLUMN_BORDER_HEIGHT: u16 = 2;

/// Width used when the terminal reports zero columns.
pub const FALLBACK_TERMINAL_WIDTH: u16 = 80;

/// Updates applied from the queue per tick.
pub const UPDATES_PER_TICK: usize = 1;
