//! Card descriptors: the render description of one item.
//!
//! A descriptor is derived from an item once and cached by the layout cache
//! until the item's reference is replaced. Its size in rows follows from the
//! descriptor alone ([`card_size`]).

use crate::model::error::CardError;
use crate::model::{resolve_identity, Item, ItemKey, ItemPayload};
use chrono::{DateTime, Utc};
use serde::Serialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Context that changes what a card needs to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CardOptions {
    /// Every item in the column belongs to one owner; drop it from subtitles.
    pub owner_is_known: bool,
    /// Every item in the column belongs to one repository; drop the subtitle.
    pub repo_is_known: bool,
}

/// Kind of card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// Card of an inbox notification.
    Notification,
    /// Card of an activity event.
    Event,
}

/// Immutable render description of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardDescriptor {
    /// Identity of the item, if it has one.
    pub key: Option<ItemKey>,
    /// Notification or event card.
    pub kind: CardKind,
    /// Unwrapped title.
    pub title: String,
    /// Title wrapped to the card width.
    pub title_lines: Vec<String>,
    /// Repository line, omitted when the repository is known.
    pub subtitle: Option<String>,
    /// Login shown in the meta row.
    pub actor: Option<String>,
    /// Reason and subject type, or event type.
    pub labels: Vec<String>,
    /// Whether the item is unread.
    pub unread: bool,
    /// Whether the item belongs to a private repository.
    pub is_private: bool,
    /// Last update time of the item.
    pub timestamp: DateTime<Utc>,
    /// Number of similar items merged into this card.
    pub merged_count: usize,
}

/// Derive the card descriptor of `item` for a card `width` cells wide.
///
/// # Errors
///
/// Returns `CardError::MissingTitle` for a blank title and
/// `CardError::MissingActor` for an event without an actor.
pub fn derive_card(
    item: &Item,
    options: CardOptions,
    width: u16,
) -> Result<CardDescriptor, CardError> {
    let key = resolve_identity(item);
    let title = item.title.trim();
    if title.is_empty() {
        return Err(CardError::MissingTitle { key });
    }

    let (kind, labels) = match &item.payload {
        ItemPayload::Notification {
            reason,
            subject_type,
        } => (
            CardKind::Notification,
            vec![reason.replace('_', " "), subject_type.clone()],
        ),
        ItemPayload::Event { event_type } => {
            if item.actor.as_deref().map_or(true, str::is_empty) {
                return Err(CardError::MissingActor { key });
            }
            (
                CardKind::Event,
                vec![event_type.trim_end_matches("Event").to_string()],
            )
        }
    };

    let subtitle = match (&item.repo, options.repo_is_known) {
        (Some(_), true) | (None, _) => None,
        (Some(repo), false) if options.owner_is_known => Some(
            repo.split_once('/')
                .map_or(repo.as_str(), |(_, name)| name)
                .to_string(),
        ),
        (Some(repo), false) => Some(repo.clone()),
    };

    Ok(CardDescriptor {
        key,
        kind,
        title: title.to_string(),
        title_lines: wrap_text(title, width),
        subtitle,
        actor: item.actor.clone(),
        labels: labels.into_iter().filter(|l| !l.is_empty()).collect(),
        unread: item.is_unread(),
        is_private: item.is_private,
        timestamp: item.updated_at,
        merged_count: item.merged.len(),
    })
}

/// Height of a card in rows.
///
/// One header row (actor and time), the wrapped title, then one row each for
/// the subtitle, the labels and the merged-items note when present.
pub fn card_size(descriptor: &CardDescriptor) -> u32 {
    let mut rows = 1 + descriptor.title_lines.len() as u32;
    if descriptor.subtitle.is_some() {
        rows += 1;
    }
    if !descriptor.labels.is_empty() {
        rows += 1;
    }
    if descriptor.merged_count > 0 {
        rows += 1;
    }
    rows
}

/// Greedy word wrap by display width. Words wider than `width` are split.
pub fn wrap_text(text: &str, width: u16) -> Vec<String> {
    let width = usize::from(width.max(1));
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0;

    for word in text.split_whitespace() {
        let word_width = word.width();

        if line_width > 0 && line_width + 1 + word_width <= width {
            line.push(' ');
            line.push_str(word);
            line_width += 1 + word_width;
            continue;
        }
        if line_width > 0 {
            lines.push(std::mem::take(&mut line));
            line_width = 0;
        }
        if word_width <= width {
            line.push_str(word);
            line_width = word_width;
            continue;
        }

        for ch in word.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if line_width + ch_width > width && line_width > 0 {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
            }
            line.push(ch);
            line_width += ch_width;
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
