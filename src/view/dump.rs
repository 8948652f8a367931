//! Headless rendering: list frames as JSON.
//!
//! Used by `--dump` to inspect what the TUI would show without a terminal.
//! One JSON object is printed per column frame.

use crate::pipeline::ListFrame;
use serde_json::{json, Value};

/// JSON description of one frame.
pub fn frame_to_json(frame: &ListFrame) -> Value {
    let items: Vec<Value> = frame
        .records
        .iter()
        .map(|record| {
            let card = frame.descriptors.get(record.index).and_then(|c| c.as_deref());
            json!({
                "index": record.index,
                "offset": record.offset,
                "length": record.length,
                "card": card,
            })
        })
        .collect();

    json!({
        "column_id": frame.column_id.as_str(),
        "title": frame.title,
        "header": frame.header,
        "footer": frame.footer,
        "separator": frame.separator,
        "item_count": frame.items.len(),
        "content_size": frame.content_size(),
        "data_version": frame.data_version.get(),
        "override": frame.override_state,
        "refresh_control": frame.refresh_control,
        "can_fetch_next_page": frame.triggers.fetch_next_page.is_some(),
        "items": items,
    })
}
