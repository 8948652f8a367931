//! UI state (pure).
//!
//! Keyboard selection per column, testable without a terminal.

pub mod navigation;

// Re-export for convenience
pub use navigation::{KeyboardSelection, NavigationCommand};
