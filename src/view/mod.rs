//! TUI rendering and terminal management (impure shell)

pub mod column;
pub mod constants;
pub mod dump;
pub mod styles;

pub use column::{render_column, visible_range, ColumnRender};
pub use dump::frame_to_json;
pub use styles::{ColorConfig, FeedStyles};

use crate::model::ColumnId;
use crate::pipeline::{FeedEngine, ListFrame, PageTriggers, Trigger};
use crate::source::{ItemUpdate, MemoryStore, SnapshotProvider};
use crate::state::{KeyboardSelection, NavigationCommand};
use column::{body_height, max_scroll, scroll_to_record};
use constants::{FALLBACK_TERMINAL_WIDTH, STATUS_BAR_HEIGHT, UPDATES_PER_TICK};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Layout, Rect},
    text::Line,
    widgets::Paragraph,
    Terminal,
};
use std::collections::{HashMap, VecDeque};
use std::io::{self, Stdout};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use chrono::Utc;
use tracing::{debug, info, warn};

/// Errors that can occur during TUI operations
#[derive(Debug, Error)]
pub enum TuiError {
    /// IO error during terminal operations
    #[error("Terminal IO error: {0}")]
    Io(#[from] io::Error),
}

/// Action requested through a column's triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// Load the queued updates of a column.
    NextPage(ColumnId),
    /// Refresh a column.
    Refresh(ColumnId),
}

/// Presentation options of the TUI.
#[derive(Debug, Clone)]
pub struct TuiOptions {
    /// Poll interval; queued updates trickle in once per tick.
    pub tick: Duration,
    /// Column width in cells, borders included.
    pub column_width: u16,
    /// Styles of cards and chrome.
    pub styles: FeedStyles,
}

/// Trigger closures of one column, created once so frames stay stable.
struct ColumnActions {
    refresh: Trigger,
    next_page: Trigger,
}

impl ColumnActions {
    fn new(column_id: &ColumnId, requests: &Sender<PageRequest>) -> Self {
        let (id, tx) = (column_id.clone(), requests.clone());
        let refresh = Trigger::new(move || send_request(&tx, PageRequest::Refresh(id.clone())));
        let (id, tx) = (column_id.clone(), requests.clone());
        let next_page =
            Trigger::new(move || send_request(&tx, PageRequest::NextPage(id.clone())));
        Self { refresh, next_page }
    }
}

/// Queue a trigger request. A closed channel means the app is gone.
fn send_request(tx: &Sender<PageRequest>, request: PageRequest) {
    if let Err(e) = tx.send(request) {
        warn!(request = ?e.0, "Dropped page request, app is no longer listening");
    }
}

/// Main TUI application
///
/// Generic over backend to support testing with TestBackend
pub struct TuiApp<B>
where
    B: Backend,
{
    terminal: Terminal<B>,
    engine: FeedEngine<MemoryStore>,
    /// Updates not applied yet. Trickled in one per tick, or all at once
    /// when a column asks for its next page.
    pending: VecDeque<ItemUpdate>,
    requests_tx: Sender<PageRequest>,
    requests_rx: Receiver<PageRequest>,
    actions: HashMap<ColumnId, ColumnActions>,
    selections: HashMap<ColumnId, KeyboardSelection>,
    scroll: HashMap<ColumnId, u64>,
    /// Body heights of the last draw, for scrolling selections into view.
    body_heights: HashMap<ColumnId, u16>,
    focused: usize,
    first_column: usize,
    options: TuiOptions,
    status: Option<String>,
}

impl TuiApp<CrosstermBackend<Stdout>> {
    /// Create and initialize a new TUI application
    ///
    /// Sets up terminal in raw mode with alternate screen
    pub fn new(
        engine: FeedEngine<MemoryStore>,
        updates: Vec<ItemUpdate>,
        options: TuiOptions,
    ) -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self::with_terminal(terminal, engine, updates, options))
    }
}

impl<B> TuiApp<B>
where
    B: Backend,
{
    fn with_terminal(
        terminal: Terminal<B>,
        engine: FeedEngine<MemoryStore>,
        updates: Vec<ItemUpdate>,
        options: TuiOptions,
    ) -> Self {
        let (requests_tx, requests_rx) = mpsc::channel();
        let mut app = Self {
            terminal,
            engine,
            pending: updates.into(),
            requests_tx,
            requests_rx,
            actions: HashMap::new(),
            selections: HashMap::new(),
            scroll: HashMap::new(),
            body_heights: HashMap::new(),
            focused: 0,
            first_column: 0,
            options,
            status: None,
        };
        app.sync_triggers();
        app
    }

    /// Run the main event loop
    ///
    /// Returns when user quits (q or Ctrl+C). Queued updates are applied on
    /// timer ticks.
    pub fn run(&mut self) -> Result<(), TuiError> {
        self.draw()?;

        loop {
            if event::poll(self.options.tick)? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key) {
                            return Ok(());
                        }
                    }
                    Event::Resize(..) => {}
                    _ => continue,
                }
            } else {
                self.tick();
            }
            self.draw()?;
        }
    }

    // ===== Ticks =====

    /// Serve trigger requests, then apply the next queued updates.
    fn tick(&mut self) {
        while let Ok(request) = self.requests_rx.try_recv() {
            self.serve(request);
        }

        for update in self.pending.drain(..UPDATES_PER_TICK.min(self.pending.len())) {
            self.engine.store_mut().apply(update);
        }

        self.sync_triggers();
    }

    fn serve(&mut self, request: PageRequest) {
        match request {
            PageRequest::NextPage(column_id) => {
                let count = self.pending.len();
                for update in self.pending.drain(..) {
                    self.engine.store_mut().apply(update);
                }
                self.mark_fetched(&column_id);
                info!(column = %column_id, count, "Loaded next page");
                self.status = Some(format!("Loaded {count} updates"));
            }
            PageRequest::Refresh(column_id) => {
                self.mark_fetched(&column_id);
                let pruned = self.engine.prune();
                debug!(column = %column_id, pruned, "Refreshed");
                self.status = Some(format!("Refreshed {column_id}"));
            }
        }
    }

    /// Stamp the column's subscriptions as fetched now.
    fn mark_fetched(&mut self, column_id: &ColumnId) {
        let Some(column) = self.engine.store().column(column_id) else {
            return;
        };
        let now = Utc::now();
        for subscription in &column.subscription_ids {
            self.engine.store_mut().set_last_fetched_at(subscription, now);
        }
    }

    /// Register every column's triggers. The next-page trigger is present
    /// while updates are queued.
    fn sync_triggers(&mut self) {
        let has_next_page = !self.pending.is_empty();
        for column_id in self.engine.store().column_ids() {
            let requests = &self.requests_tx;
            let actions = self
                .actions
                .entry(column_id.clone())
                .or_insert_with(|| ColumnActions::new(&column_id, requests));
            let triggers = PageTriggers {
                fetch_next_page: has_next_page.then(|| actions.next_page.clone()),
                refresh: Some(actions.refresh.clone()),
            };
            self.engine.set_triggers(&column_id, triggers);
        }
    }

    // ===== Keys =====

    /// Handle a key event. Returns true when the user quits.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        let Some(column_id) = self.focused_column() else {
            return matches!(key.code, KeyCode::Char('q'))
                || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));
        };

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') => return true,
            KeyCode::Char('j') | KeyCode::Down => {
                self.navigate(NavigationCommand::ScrollDown { column_id });
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.navigate(NavigationCommand::ScrollUp { column_id });
            }
            KeyCode::Char('h') | KeyCode::Left => self.move_focus(-1),
            KeyCode::Char('l') | KeyCode::Right => self.move_focus(1),
            KeyCode::Esc => {
                if let Some(selection) = self.selections.get_mut(&column_id) {
                    selection.clear();
                }
            }
            KeyCode::Char('n') => {
                let frame = self.engine.list_frame(&column_id);
                match &frame.triggers.fetch_next_page {
                    Some(trigger) => trigger.fire(),
                    None => self.status = Some("No more pages".to_string()),
                }
            }
            KeyCode::Char('r') => {
                let frame = self.engine.list_frame(&column_id);
                if let Some(trigger) = &frame.triggers.refresh {
                    trigger.fire();
                }
            }
            _ => {}
        }
        false
    }

    fn focused_column(&self) -> Option<ColumnId> {
        let ids = self.engine.store().column_ids();
        ids.get(self.focused.min(ids.len().saturating_sub(1))).cloned()
    }

    fn move_focus(&mut self, delta: isize) {
        let count = self.engine.store().column_ids().len();
        if count == 0 {
            return;
        }
        let next = self
            .focused
            .saturating_add_signed(delta)
            .min(count - 1);
        if next == self.focused {
            return;
        }

        if let Some(previous) = self.focused_column() {
            self.navigate(NavigationCommand::Focus {
                column_id: previous,
                focus_on_visible_item: false,
            });
        }
        self.focused = next;
        if let Some(column_id) = self.focused_column() {
            self.navigate(NavigationCommand::Focus {
                column_id,
                focus_on_visible_item: true,
            });
        }
    }

    /// Route a command to its column's selection and scroll the result
    /// into view.
    fn navigate(&mut self, command: NavigationCommand) {
        let column_id = command.column_id().clone();
        let frame = self.engine.list_frame(&column_id);
        let cursor = self.engine.visible_cursor(&column_id);
        let selection = self
            .selections
            .entry(column_id.clone())
            .or_insert_with(|| KeyboardSelection::new(column_id.clone(), cursor));

        let Some(index) = selection.handle(&command, &frame.items) else {
            return;
        };
        let Some(record) = frame.records.get(index) else {
            return;
        };
        let height = self.body_heights.get(&column_id).copied().unwrap_or(0);
        let scroll = self.scroll.entry(column_id).or_default();
        *scroll = scroll_to_record(record, *scroll, u64::from(height.max(1)));
    }

    // ===== Drawing =====

    fn draw(&mut self) -> Result<(), TuiError> {
        let frames = self.engine.frames();
        if !frames.is_empty() {
            self.focused = self.focused.min(frames.len() - 1);
        }

        let size = self.terminal.size()?;
        let width = if size.width == 0 {
            FALLBACK_TERMINAL_WIDTH
        } else {
            size.width
        };
        let area = Rect::new(0, 0, width, size.height);
        let [columns_area, status_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(STATUS_BAR_HEIGHT)])
                .areas(area);

        let shown = self.column_slots(columns_area, frames.len());

        for (rect, index) in &shown {
            let frame = &frames[*index];
            let height = body_height(frame, *rect);
            self.body_heights.insert(frame.column_id.clone(), height);

            let scroll = self.scroll.entry(frame.column_id.clone()).or_default();
            *scroll = (*scroll).min(max_scroll(frame, u64::from(height)));
            let range = visible_range(&frame.records, frame.separator, *scroll, u64::from(height));
            self.engine
                .on_visible_range_changed(&frame.column_id, range.start);
        }

        let status = self.status_line(&frames);
        let (scroll, selections) = (&self.scroll, &self.selections);
        let (styles, focused) = (&self.options.styles, self.focused);

        self.terminal.draw(|f| {
            for (rect, index) in &shown {
                let frame = &frames[*index];
                let view = ColumnRender {
                    frame,
                    scroll: scroll.get(&frame.column_id).copied().unwrap_or(0),
                    selected: selections
                        .get(&frame.column_id)
                        .and_then(|s| s.selected_index(&frame.items)),
                    focused: *index == focused,
                };
                render_column(f, *rect, &view, styles);
            }
            f.render_widget(Paragraph::new(Line::styled(status, styles.meta)), status_area);
        })?;

        Ok(())
    }

    /// Areas of the columns that fit, keeping the focused one in view.
    fn column_slots(&mut self, area: Rect, count: usize) -> Vec<(Rect, usize)> {
        let column_width = self.options.column_width.max(1);
        let per_screen = usize::from((area.width / column_width).max(1));

        if self.focused < self.first_column {
            self.first_column = self.focused;
        } else if self.focused >= self.first_column + per_screen {
            self.first_column = self.focused + 1 - per_screen;
        }

        (self.first_column..count)
            .take(per_screen)
            .enumerate()
            .map(|(slot, index)| {
                let x = area.x + column_width * slot as u16;
                let width = column_width.min(area.width.saturating_sub(x - area.x));
                (Rect::new(x, area.y, width, area.height), index)
            })
            .collect()
    }

    fn status_line(&self, frames: &[Arc<ListFrame>]) -> String {
        let position = match frames.get(self.focused) {
            Some(frame) => format!("{} [{}/{}]", frame.title, self.focused + 1, frames.len()),
            None => "no columns".to_string(),
        };
        let mut line = format!(
            "{position} · {} queued · j/k select · h/l column · n more · r refresh · q quit",
            self.pending.len()
        );
        if let Some(status) = &self.status {
            line.push_str(" · ");
            line.push_str(status);
        }
        line
    }
}

/// Test-only methods for TuiApp
#[cfg(test)]
impl<B> TuiApp<B>
where
    B: Backend,
{
    pub(crate) fn new_for_test(
        terminal: Terminal<B>,
        engine: FeedEngine<MemoryStore>,
        updates: Vec<ItemUpdate>,
        options: TuiOptions,
    ) -> Self {
        Self::with_terminal(terminal, engine, updates, options)
    }

    pub(crate) fn selected_key(&self, column_id: &ColumnId) -> Option<crate::model::ItemKey> {
        self.selections.get(column_id)?.selected().cloned()
    }
}

/// Initialize and run the TUI application
///
/// This is the main entry point for the TUI. It handles terminal
/// setup, runs the event loop, and ensures cleanup on exit.
///
/// Note: Logging must be initialized by caller before calling this function.
pub fn run_tui(
    engine: FeedEngine<MemoryStore>,
    updates: Vec<ItemUpdate>,
    options: TuiOptions,
) -> Result<(), TuiError> {
    let mut app = TuiApp::new(engine, updates, options)?;

    // Run the app and ensure cleanup happens even on error
    let result = app.run();

    // Always restore terminal state
    restore_terminal()?;

    result
}

/// Restore terminal to normal state
///
/// Disables raw mode and leaves alternate screen
fn restore_terminal() -> Result<(), TuiError> {
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
