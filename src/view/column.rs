//! Column widget: renders one [`ListFrame`] inside a bordered block.
//!
//! Only the cards intersecting the viewport are turned into lines. The
//! viewport is located with the frame's layout records, so rendering never
//! measures a card.

use super::constants::COLUMN_BORDER_HEIGHT;
use super::styles::FeedStyles;
use crate::pipeline::{CardDescriptor, FooterState, LayoutRecord, ListFrame, OverrideState};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::ops::Range;

/// Per-column view state owned by the host.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRender<'a> {
    /// Frame to draw.
    pub frame: &'a ListFrame,
    /// Offset of the viewport from the first item.
    pub scroll: u64,
    /// Highlighted item index.
    pub selected: Option<usize>,
    /// Whether the column has keyboard focus.
    pub focused: bool,
}

// ===== Geometry =====

/// Indices of the items intersecting `[scroll, scroll + height)`.
///
/// An item covers its length plus the separator after it.
pub fn visible_range(
    records: &[LayoutRecord],
    separator: u32,
    scroll: u64,
    height: u64,
) -> Range<usize> {
    let start = records.partition_point(|r| {
        r.offset + u64::from(r.length) + u64::from(separator) <= scroll
    });
    let end = records.partition_point(|r| r.offset < scroll + height);
    start..end.max(start)
}

/// Scroll offset that keeps `record` inside a viewport of `height` rows.
pub fn scroll_to_record(record: &LayoutRecord, scroll: u64, height: u64) -> u64 {
    let bottom = record.offset + u64::from(record.length);
    if record.offset < scroll {
        record.offset
    } else if bottom > scroll + height {
        bottom.saturating_sub(height).min(record.offset)
    } else {
        scroll
    }
}

/// Largest useful scroll offset: items and footer end at the bottom edge.
pub fn max_scroll(frame: &ListFrame, height: u64) -> u64 {
    let content = frame.content_size() - u64::from(frame.header.size);
    content.saturating_sub(height)
}

/// Rows left for items once borders and the header are taken.
pub fn body_height(frame: &ListFrame, area: Rect) -> u16 {
    let inner = area.height.saturating_sub(COLUMN_BORDER_HEIGHT);
    let header = u16::try_from(frame.header.size).unwrap_or(u16::MAX);
    inner.saturating_sub(header)
}

// ===== Lines =====

/// Lines of a card, one per row of its size.
pub fn card_lines(card: &CardDescriptor, styles: &FeedStyles) -> Vec<Line<'static>> {
    let mut meta = vec![Span::styled(
        card.actor.clone().unwrap_or_default(),
        styles.meta,
    )];
    meta.push(Span::styled(
        format!(" {}", card.timestamp.format("%b %d %H:%M")),
        styles.meta,
    ));
    if card.unread {
        meta.push(Span::styled(" ●", styles.labels));
    }
    if card.is_private {
        meta.push(Span::styled(" private", styles.meta));
    }

    let title_style = if card.unread {
        styles.unread_title
    } else {
        styles.title
    };

    let mut lines = vec![Line::from(meta)];
    lines.extend(
        card.title_lines
            .iter()
            .map(|l| Line::styled(l.clone(), title_style)),
    );
    if let Some(subtitle) = &card.subtitle {
        lines.push(Line::styled(subtitle.clone(), styles.subtitle));
    }
    if !card.labels.is_empty() {
        lines.push(Line::styled(card.labels.join(" · "), styles.labels));
    }
    if card.merged_count > 0 {
        lines.push(Line::styled(
            format!("+{} similar", card.merged_count),
            styles.meta,
        ));
    }
    lines
}

/// Header row: item count, then the refresh control title when present.
pub fn header_line(list: &ListFrame, styles: &FeedStyles) -> Line<'static> {
    let count = match list.items.len() {
        1 => "1 item".to_string(),
        n => format!("{n} items"),
    };
    let mut spans = vec![Span::styled(count, styles.meta)];
    if let Some(refresh) = &list.refresh_control {
        spans.push(Span::styled(format!(" · {}", refresh.title), styles.meta));
    }
    Line::from(spans)
}

fn footer_text(state: FooterState) -> Option<&'static str> {
    match state {
        FooterState::Cleared => Some("Column cleared. New items will show up here."),
        FooterState::Empty => Some("Nothing to show."),
        FooterState::LoadMore => Some("Press n to load more"),
        FooterState::End => None,
    }
}

/// Lines of the viewport `[scroll, scroll + height)` below the header.
pub fn body_lines(
    view: &ColumnRender<'_>,
    styles: &FeedStyles,
    height: u16,
) -> Vec<Line<'static>> {
    let frame = view.frame;
    let height_rows = u64::from(height);
    let mut rows = vec![Line::default(); usize::from(height)];

    let mut place = |top: i64, lines: Vec<Line<'static>>| {
        for (row, line) in lines.into_iter().enumerate() {
            let y = top + row as i64;
            if y < 0 {
                continue;
            }
            match rows.get_mut(y as usize) {
                Some(slot) => *slot = line,
                None => break,
            }
        }
    };

    let range = visible_range(&frame.records, frame.separator, view.scroll, height_rows);
    for index in range {
        let record = &frame.records[index];
        let Some(Some(card)) = frame.descriptors.get(index) else {
            continue;
        };
        let mut lines = card_lines(card, styles);
        if view.selected == Some(index) {
            lines = lines
                .into_iter()
                .map(|l| l.patch_style(styles.selected))
                .collect();
        }
        place(record.offset as i64 - view.scroll as i64, lines);
    }

    if let Some(text) = footer_text(frame.footer.state) {
        let items_end = frame
            .records
            .last()
            .map(|r| r.offset + u64::from(r.length) + u64::from(frame.separator))
            .unwrap_or(0);
        place(
            items_end as i64 - view.scroll as i64,
            vec![Line::styled(text, styles.footer)],
        );
    }

    rows
}

// ===== Rendering =====

/// Render a column into `area`.
pub fn render_column(frame: &mut Frame, area: Rect, view: &ColumnRender<'_>, styles: &FeedStyles) {
    let list = view.frame;
    let border = if view.focused {
        styles.focused_border
    } else {
        styles.border
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(list.title.clone(), border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(OverrideState::ColumnLimitReached { title, message, .. }) = &list.override_state
    {
        let text = vec![
            Line::styled(title.clone(), styles.warning),
            Line::default(),
            Line::from(message.clone()),
        ];
        frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
        return;
    }

    let header_rows = u16::try_from(list.header.size).unwrap_or(u16::MAX);
    let [header_area, body_area] =
        Layout::vertical([Constraint::Length(header_rows), Constraint::Min(0)]).areas(inner);

    frame.render_widget(Paragraph::new(header_line(list, styles)), header_area);

    let lines = body_lines(view, styles, body_area.height);
    frame.render_widget(Paragraph::new(lines), body_area);
}

#[cfg(test)]
#[path = "column_tests.rs"]
mod tests;
