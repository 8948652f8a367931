//! Keyboard selection within a column.
//!
//! The selection follows an item identity, not a position, so it survives
//! items being inserted above it. When nothing is selected yet, moving the
//! selection starts from the first visible item reported by the host.

use crate::model::{resolve_identity, ColumnId, Item, ItemKey};
use crate::pipeline::VisibleCursor;
use std::sync::Arc;

/// Column-addressed navigation command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationCommand {
    /// Select the previous item.
    ScrollUp {
        /// Target column.
        column_id: ColumnId,
    },
    /// Select the next item.
    ScrollDown {
        /// Target column.
        column_id: ColumnId,
    },
    /// Focus the column. Selects the first visible item when
    /// `focus_on_visible_item` is set, otherwise clears the selection.
    Focus {
        /// Target column.
        column_id: ColumnId,
        /// Whether to select the first visible item.
        focus_on_visible_item: bool,
    },
}

impl NavigationCommand {
    /// Column the value addresses.
    pub fn column_id(&self) -> &ColumnId {
        match self {
            Self::ScrollUp { column_id }
            | Self::ScrollDown { column_id }
            | Self::Focus { column_id, .. } => column_id,
        }
    }
}

/// Selected item of one column.
#[derive(Debug, Clone)]
pub struct KeyboardSelection {
    column_id: ColumnId,
    cursor: VisibleCursor,
    selected: Option<ItemKey>,
}

impl KeyboardSelection {
    /// Empty selection of `column_id`, starting from `cursor` when moved.
    pub fn new(column_id: ColumnId, cursor: VisibleCursor) -> Self {
        Self {
            column_id,
            cursor,
            selected: None,
        }
    }

    /// Column the value addresses.
    pub fn column_id(&self) -> &ColumnId {
        &self.column_id
    }

    /// Identity of the selected item.
    pub fn selected(&self) -> Option<&ItemKey> {
        self.selected.as_ref()
    }

    /// Position of the selected item in `items`.
    pub fn selected_index(&self, items: &[Arc<Item>]) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        items
            .iter()
            .position(|item| resolve_identity(item).as_ref() == Some(selected))
    }

    /// Apply a command addressed to any column.
    ///
    /// Commands for other columns are ignored. Returns the index to scroll
    /// to, if any.
    pub fn handle(&mut self, command: &NavigationCommand, items: &[Arc<Item>]) -> Option<usize> {
        if command.column_id() != &self.column_id {
            return None;
        }
        match command {
            NavigationCommand::ScrollUp { .. } => self.scroll_up(items),
            NavigationCommand::ScrollDown { .. } => self.scroll_down(items),
            NavigationCommand::Focus {
                focus_on_visible_item,
                ..
            } => self.focus(items, *focus_on_visible_item),
        }
    }

    /// Select the previous item.
    pub fn scroll_up(&mut self, items: &[Arc<Item>]) -> Option<usize> {
        let index = match (&self.selected, self.selected_index(items)) {
            (None, _) => self.first_visible(),
            (Some(_), Some(current)) => current.saturating_sub(1),
            (Some(_), None) => 0,
        };
        self.select(items, Some(index.min(items.len().saturating_sub(1))))
    }

    /// Select the next item.
    pub fn scroll_down(&mut self, items: &[Arc<Item>]) -> Option<usize> {
        let index = match (&self.selected, self.selected_index(items)) {
            (None, _) => self.first_visible(),
            (Some(_), Some(current)) => current + 1,
            (Some(_), None) => 0,
        };
        self.select(items, Some(index.min(items.len().saturating_sub(1))))
    }

    /// Select the first visible item, or clear the selection.
    pub fn focus(&mut self, items: &[Arc<Item>], on_visible_item: bool) -> Option<usize> {
        let index = on_visible_item.then(|| self.first_visible());
        self.select(items, index)
    }

    /// Clear the selection (Escape).
    pub fn clear(&mut self) {
        self.selected = None;
    }

    fn first_visible(&self) -> usize {
        self.cursor.get().unwrap_or(0)
    }

    fn select(&mut self, items: &[Arc<Item>], index: Option<usize>) -> Option<usize> {
        let found = index.and_then(|i| items.get(i).map(|item| (i, resolve_identity(item))));
        match found {
            Some((i, Some(key))) => {
                self.selected = Some(key);
                Some(i)
            }
            _ => {
                self.selected = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::test_support::notification;

    fn items(n: u64) -> Vec<Arc<Item>> {
        (1..=n)
            .map(|i| Arc::new(notification(i, &format!("item {i}"))))
            .collect()
    }

    fn key(id: u64) -> ItemKey {
        ItemKey::new(id.to_string()).unwrap()
    }

    fn selection() -> (KeyboardSelection, VisibleCursor) {
        let cursor = VisibleCursor::new();
        (
            KeyboardSelection::new(ColumnId::new("inbox"), cursor.clone()),
            cursor,
        )
    }

    #[test]
    fn first_move_selects_first_visible_item() {
        let (mut sel, cursor) = selection();
        cursor.set(3);

        assert_eq!(sel.scroll_down(&items(10)), Some(3));
        assert_eq!(sel.selected(), Some(&key(4)));
    }

    #[test]
    fn first_move_without_visibility_selects_top() {
        let (mut sel, _) = selection();
        assert_eq!(sel.scroll_up(&items(5)), Some(0));
    }

    #[test]
    fn moves_are_clamped_to_list() {
        let (mut sel, _) = selection();
        let list = items(3);

        sel.scroll_down(&list);
        sel.scroll_down(&list);
        sel.scroll_down(&list);
        assert_eq!(sel.scroll_down(&list), Some(2));

        sel.scroll_up(&list);
        sel.scroll_up(&list);
        assert_eq!(sel.scroll_up(&list), Some(0));
    }

    #[test]
    fn selection_follows_identity_when_items_shift() {
        let (mut sel, _) = selection();
        let list = items(3);
        sel.scroll_down(&list);
        sel.scroll_down(&list);
        assert_eq!(sel.selected(), Some(&key(2)));

        // A new item arrives on top
        let mut shifted = vec![Arc::new(notification(99, "new"))];
        shifted.extend(list);

        assert_eq!(sel.selected_index(&shifted), Some(2));
        assert_eq!(sel.scroll_down(&shifted), Some(3));
    }

    #[test]
    fn vanished_selection_restarts_at_top() {
        let (mut sel, _) = selection();
        sel.scroll_down(&items(3));
        sel.scroll_down(&items(3));

        let others: Vec<_> = (10..13)
            .map(|i| Arc::new(notification(i, "other")))
            .collect();

        assert_eq!(sel.scroll_down(&others), Some(0));
    }

    #[test]
    fn focus_without_visible_item_clears() {
        let (mut sel, _) = selection();
        sel.scroll_down(&items(3));

        assert_eq!(sel.focus(&items(3), false), None);
        assert_eq!(sel.selected(), None);
    }

    #[test]
    fn focus_on_visible_item_selects_it() {
        let (mut sel, cursor) = selection();
        cursor.set(1);

        assert_eq!(sel.focus(&items(3), true), Some(1));
    }

    #[test]
    fn empty_list_has_no_selection() {
        let (mut sel, _) = selection();
        assert_eq!(sel.scroll_down(&[]), None);
        assert_eq!(sel.selected(), None);
    }

    #[test]
    fn commands_for_other_columns_are_ignored() {
        let (mut sel, _) = selection();
        let command = NavigationCommand::ScrollDown {
            column_id: ColumnId::new("elsewhere"),
        };

        assert_eq!(sel.handle(&command, &items(3)), None);
        assert_eq!(sel.selected(), None);
    }

    #[test]
    fn escape_clears_selection() {
        let (mut sel, _) = selection();
        sel.scroll_down(&items(2));
        sel.clear();
        assert_eq!(sel.selected(), None);
    }
}
