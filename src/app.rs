use crate::collection::ImportCollection;
use crate::config::AppConfig;
use crate::dispatcher::Outcome;
use crate::domain::{BelongingToView, CommandKind, ElementId, Entry, InsertType};
use crate::error::WorkflowError;
use crate::infra::HostContext;
use crate::workflow::DeleteWorkflow;

const MAX_LOG_LINES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneFocus {
    List,
    Log,
}

impl PaneFocus {
    pub fn next(self) -> Self {
        match self {
            Self::List => Self::Log,
            Self::Log => Self::List,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmChoice {
    Yes,
    No,
}

impl ConfirmChoice {
    pub fn toggle(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalState {
    None,
    Search { value: String, original: String },
    Confirm { count: usize, choice: ConfirmChoice },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadReason {
    Startup,
    Manual,
    AfterDelete,
}

#[derive(Debug, Clone)]
pub enum BackendTask {
    Reload { reason: ReloadReason },
}

#[derive(Debug, Clone)]
pub enum BackendEvent {
    Reloaded {
        reason: ReloadReason,
        context: HostContext,
        snapshot: Result<Vec<Entry>, WorkflowError>,
    },
    CommandFinished {
        kind: CommandKind,
        outcome: Outcome,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug)]
pub struct App {
    pub focus: PaneFocus,
    pub collection: ImportCollection,
    pub workflow: DeleteWorkflow,
    pub host: HostContext,
    pub selected_index: usize,
    list_scroll: usize,
    pub logs: Vec<String>,
    pub log_tail_offset: usize,
    pub modal: ModalState,
    pub notice: Option<Notice>,
    in_flight: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: &AppConfig) -> Self {
        let mut collection = ImportCollection::default();
        collection.set_filter_state(config.initial_filter());
        let workflow = DeleteWorkflow::new(config.keep_on_top);
        Self {
            focus: PaneFocus::List,
            collection,
            workflow,
            host: HostContext::default(),
            selected_index: 0,
            list_scroll: 0,
            logs: vec!["cadimport-tui started".to_string()],
            log_tail_offset: 0,
            modal: ModalState::None,
            notice: None,
            in_flight: 0,
            should_quit: false,
        }
    }

    pub fn document(&self) -> &str {
        &self.host.document
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn request_started(&mut self) {
        self.in_flight += 1;
    }

    // Every reload and every submitted command yields exactly one backend event.
    pub fn request_settled(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn accepts_edits(&self) -> bool {
        self.workflow.is_idle()
    }

    pub fn select_next(&mut self) {
        let len = self.current_len();
        if len == 0 {
            self.selected_index = 0;
            return;
        }
        self.selected_index = (self.selected_index + 1) % len;
    }

    pub fn select_prev(&mut self) {
        let len = self.current_len();
        if len == 0 {
            self.selected_index = 0;
            return;
        }
        if self.selected_index == 0 {
            self.selected_index = len - 1;
        } else {
            self.selected_index -= 1;
        }
    }

    pub fn current_len(&self) -> usize {
        self.collection.visible_len()
    }

    pub fn list_scroll(&self) -> usize {
        self.list_scroll
    }

    pub fn sync_list_scroll(&mut self, viewport_rows: usize) {
        let len = self.current_len();
        if len == 0 {
            self.list_scroll = 0;
            return;
        }

        let rows = viewport_rows.max(1);
        if self.selected_index < self.list_scroll {
            self.list_scroll = self.selected_index;
        } else if self.selected_index >= self.list_scroll + rows {
            self.list_scroll = self.selected_index + 1 - rows;
        }

        let max_offset = len.saturating_sub(rows);
        if self.list_scroll > max_offset {
            self.list_scroll = max_offset;
        }
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.collection
            .visible_indices()
            .get(self.selected_index)
            .copied()
    }

    pub fn focused_entry(&self) -> Option<&Entry> {
        self.focused_index()
            .and_then(|index| self.collection.entry(index))
    }

    pub fn focused_id(&self) -> Option<ElementId> {
        self.focused_entry().map(|entry| entry.id)
    }

    pub fn current_items(&self) -> Vec<String> {
        self.collection
            .entries()
            .iter()
            .filter(|entry| entry.visible())
            .map(format_row)
            .collect()
    }

    pub fn toggle_focused_selection(&mut self) -> bool {
        match self.focused_index() {
            Some(index) => self.collection.toggle_selected(index),
            None => false,
        }
    }

    pub fn cycle_belonging_to_view(&mut self) -> BelongingToView {
        let focused = self.focused_id();
        let next = self.collection.filter().belonging_to_view.next();
        self.collection.set_belonging_to_view(next);
        self.refocus(focused);
        next
    }

    pub fn cycle_insert_type(&mut self) -> InsertType {
        let focused = self.focused_id();
        let next = self.collection.filter().insert_type.next();
        self.collection.set_insert_type(next);
        self.refocus(focused);
        next
    }

    pub fn search_text(&self) -> &str {
        &self.collection.filter().search_text
    }

    pub fn apply_search_immediately(&mut self, value: String) {
        let focused = self.focused_id();
        if self.collection.set_search_text(value) {
            self.refocus(focused);
        }
    }

    pub fn open_search(&mut self) {
        let current = self.search_text().to_string();
        self.modal = ModalState::Search {
            value: current.clone(),
            original: current,
        };
    }

    pub fn open_confirm(&mut self, count: usize) {
        self.modal = ModalState::Confirm {
            count,
            choice: ConfirmChoice::No,
        };
    }

    pub fn close_modal(&mut self) {
        self.modal = ModalState::None;
    }

    pub fn apply_snapshot(
        &mut self,
        snapshot: Result<Vec<Entry>, WorkflowError>,
    ) -> Result<(), WorkflowError> {
        let focused = self.focused_id();
        self.collection.load(snapshot?)?;
        self.refocus(focused);
        Ok(())
    }

    pub fn refocus(&mut self, id: Option<ElementId>) {
        let position = id.and_then(|id| {
            self.collection
                .visible_indices()
                .iter()
                .position(|&index| self.collection.entry(index).map(|e| e.id) == Some(id))
        });
        match position {
            Some(position) => self.selected_index = position,
            None => self.sync_selection_bounds(),
        }
    }

    pub fn sync_selection_bounds(&mut self) {
        let len = self.current_len();
        if len == 0 {
            self.selected_index = 0;
            self.list_scroll = 0;
        } else if self.selected_index >= len {
            self.selected_index = len - 1;
        }
    }

    pub fn notify(&mut self, level: NoticeLevel, text: String) {
        let prefix = match level {
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        self.log(format!("{prefix}: {text}"));
        self.notice = Some(Notice { level, text });
    }

    pub fn log(&mut self, line: String) {
        self.logs.push(line);
        if self.log_tail_offset > 0 {
            self.log_tail_offset = self.log_tail_offset.saturating_add(1);
        }
        if self.logs.len() > MAX_LOG_LINES {
            let to_trim = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(0..to_trim);
        }
    }

    pub fn scroll_log_up(&mut self, lines: usize) -> bool {
        let before = self.log_tail_offset;
        let max = self.logs.len().saturating_sub(1);
        self.log_tail_offset = self.log_tail_offset.saturating_add(lines).min(max);
        self.log_tail_offset != before
    }

    pub fn scroll_log_down(&mut self, lines: usize) -> bool {
        let before = self.log_tail_offset;
        self.log_tail_offset = self.log_tail_offset.saturating_sub(lines);
        self.log_tail_offset != before
    }
}

fn format_row(entry: &Entry) -> String {
    let mark = if entry.selected { "[x]" } else { "[ ]" };
    let owner = if entry.owner_view_name.is_empty() {
        "-"
    } else {
        entry.owner_view_name.as_str()
    };
    let category = entry.category.as_deref().unwrap_or("-");
    format!(
        "{mark} {:<6} {}  ({owner}, {category})",
        entry.insert_label(),
        entry.name
    )
}
