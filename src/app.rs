use crate::{
    config::ViewerConfig,
    loader::{self, LoadError, LOAD_FAILED_MESSAGE},
    render::{self, DetailPanel},
    sheet::SheetData,
    state::{self, ViewEvent, ViewState},
};
use arboard::Clipboard;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
    time::{Duration, Instant},
};

const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Unloaded,
    Loading,
    Loaded,
    LoadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Series,
    Chapters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

enum LoadMessage {
    Finished(SheetData),
    Failed(LoadError),
}

pub struct App {
    pub config: ViewerConfig,
    pub phase: LoadPhase,
    pub view: ViewState,
    pub status: String,
    pub focus: Focus,
    pub input_mode: InputMode,
    pub cursor: usize,
    pub logs: Vec<LogEntry>,
    pub log_scroll: usize,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    clipboard: Option<Clipboard>,
    log_path: Option<PathBuf>,
    load_tx: Sender<LoadMessage>,
    load_rx: Receiver<LoadMessage>,
}

impl App {
    pub fn new(config: ViewerConfig, log_path: Option<PathBuf>) -> Self {
        let (load_tx, load_rx) = mpsc::channel();
        Self {
            config,
            phase: LoadPhase::Unloaded,
            view: ViewState::default(),
            status: String::new(),
            focus: Focus::Chapters,
            input_mode: InputMode::Normal,
            cursor: 0,
            logs: Vec::new(),
            log_scroll: 0,
            toast: None,
            should_quit: false,
            clipboard: None,
            log_path,
            load_tx,
            load_rx,
        }
    }

    /// Kicks off the one sheet download. Later calls are ignored.
    pub fn start_load(&mut self) {
        if !self.begin_loading() {
            return;
        }
        let config = self.config.clone();
        let tx = self.load_tx.clone();
        thread::spawn(move || {
            let message = match loader::fetch_sheet(&config) {
                Ok(data) => LoadMessage::Finished(data),
                Err(err) => LoadMessage::Failed(err),
            };
            let _ = tx.send(message);
        });
    }

    pub(crate) fn begin_loading(&mut self) -> bool {
        if self.phase != LoadPhase::Unloaded {
            return false;
        }
        self.phase = LoadPhase::Loading;
        self.status = "Loading data…".to_string();
        self.log_info(format!("Fetching {}", loader::sheet_url(&self.config)));
        true
    }

    pub fn poll_load(&mut self) {
        loop {
            match self.load_rx.try_recv() {
                Ok(LoadMessage::Finished(data)) => self.finish_load(Ok(data)),
                Ok(LoadMessage::Failed(err)) => self.finish_load(Err(err)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    pub fn finish_load(&mut self, result: Result<SheetData, LoadError>) {
        if self.phase != LoadPhase::Loading {
            return;
        }
        match result {
            Ok(data) => {
                for column in &data.missing_columns {
                    self.log_warn(format!("Column not found in sheet: \"{column}\""));
                }
                self.log_info(format!(
                    "Received {} row(s), kept {} manga row(s)",
                    data.received,
                    data.rows.len()
                ));
                self.view = ViewState::from_rows(data.rows);
                let kept = self.view.rows().len();
                self.phase = LoadPhase::Loaded;
                self.cursor = 0;
                self.status.clear();
                self.log_info(format!("{} series available", self.view.series().len()));
                self.set_toast(
                    &format!("Loaded {kept} chapter(s)"),
                    ToastLevel::Info,
                    Duration::from_secs(2),
                );
            }
            Err(err) => {
                self.phase = LoadPhase::LoadFailed;
                self.status = LOAD_FAILED_MESSAGE.to_string();
                self.log_error(format!("Load failed: {err}"));
                self.set_toast("Load failed (see log)", ToastLevel::Error, Duration::from_secs(4));
            }
        }
    }

    fn dispatch(&mut self, event: ViewEvent) {
        if self.phase != LoadPhase::Loaded {
            return;
        }
        let refilter = !matches!(event, ViewEvent::SelectRow(_));
        let view = std::mem::take(&mut self.view);
        self.view = state::reduce(view, event);
        if refilter {
            self.cursor = 0;
        }
        self.clamp_cursor();
    }

    pub fn select_series(&mut self, name: String) {
        if self.view.current_series() == Some(name.as_str()) {
            return;
        }
        self.dispatch(ViewEvent::SelectSeries(name));
        self.status = self.view.title();
    }

    pub fn select_series_offset(&mut self, delta: isize) {
        let count = self.view.series().len();
        if count == 0 {
            return;
        }
        let current = self.view.current_series_index().unwrap_or(0);
        let next = if delta.is_negative() {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current.saturating_add(delta as usize).min(count - 1)
        };
        if let Some(name) = self.view.series().get(next).cloned() {
            self.select_series(name);
        }
    }

    pub fn cycle_focus(&mut self) {
        if self.phase != LoadPhase::Loaded {
            return;
        }
        self.focus = match self.focus {
            Focus::Series => Focus::Chapters,
            Focus::Chapters => Focus::Series,
        };
        self.status = match self.focus {
            Focus::Series => "Focus: series".to_string(),
            Focus::Chapters => "Focus: chapters".to_string(),
        };
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if delta.is_negative() {
            self.cursor = self.cursor.saturating_sub(delta.unsigned_abs());
        } else {
            self.cursor = self.cursor.saturating_add(delta as usize);
        }
        self.clamp_cursor();
    }

    pub fn cursor_to_end(&mut self) {
        self.cursor = usize::MAX;
        self.clamp_cursor();
    }

    pub fn clamp_cursor(&mut self) {
        let len = self.view.view().visible.len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    pub fn cursor_row_id(&self) -> Option<usize> {
        self.view.view().visible.get(self.cursor).copied()
    }

    /// Marks the row under the cursor as selected and fills the detail panel.
    pub fn select_cursor_row(&mut self) {
        let Some(row_id) = self.cursor_row_id() else {
            return;
        };
        self.dispatch(ViewEvent::SelectRow(row_id));
    }

    pub fn enter_search(&mut self) {
        if self.phase != LoadPhase::Loaded {
            return;
        }
        self.input_mode = InputMode::Search;
        self.status = "Search: type to filter, Enter/Esc to finish".to_string();
    }

    pub fn leave_search(&mut self) {
        self.input_mode = InputMode::Normal;
        self.status = if self.view.search().trim().is_empty() {
            String::new()
        } else {
            format!("Filter: \"{}\"", self.view.search().trim())
        };
    }

    pub fn push_search_char(&mut self, ch: char) {
        let mut term = self.view.search().to_string();
        term.push(ch);
        self.dispatch(ViewEvent::Search(term));
    }

    pub fn pop_search_char(&mut self) {
        let mut term = self.view.search().to_string();
        if term.pop().is_none() {
            return;
        }
        self.dispatch(ViewEvent::Search(term));
    }

    pub fn clear_search(&mut self) {
        if self.phase != LoadPhase::Loaded {
            return;
        }
        if self.view.search().is_empty() {
            self.status = "Search already cleared".to_string();
            return;
        }
        self.dispatch(ViewEvent::Search(String::new()));
        self.status = "Search cleared".to_string();
    }

    pub fn copy_detail_to_clipboard(&mut self) {
        let DetailPanel::Chapter(detail) = render::detail_panel(&self.view) else {
            self.set_toast("Select a row first", ToastLevel::Warn, Duration::from_secs(2));
            return;
        };
        let text = detail.to_text();
        match self.clipboard().and_then(|clipboard| clipboard.set_text(text)) {
            Ok(()) => {
                self.status = format!("Copied details for chapter #{}", detail.seq);
                self.set_toast("Chapter details copied", ToastLevel::Info, Duration::from_secs(2));
            }
            Err(err) => {
                self.status = "Could not copy chapter details (see log)".to_string();
                self.log_warn(format!("Clipboard: {err}"));
                self.set_toast("Copy failed", ToastLevel::Warn, Duration::from_secs(3));
            }
        }
    }

    /// Opens the system clipboard on first use and keeps it for the session.
    fn clipboard(&mut self) -> Result<&mut Clipboard, arboard::Error> {
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new()?);
        }
        self.clipboard
            .as_mut()
            .ok_or(arboard::Error::ClipboardNotSupported)
    }

    pub fn tick(&mut self) {
        if let Some(toast) = &self.toast {
            if toast.expires_at <= Instant::now() {
                self.toast = None;
            }
        }
    }

    pub fn set_toast(&mut self, message: &str, level: ToastLevel, duration: Duration) {
        self.toast = Some(Toast {
            message: message.to_string(),
            level,
            expires_at: Instant::now() + duration,
        });
    }

    pub fn hint(&self) -> &'static str {
        match (self.phase, self.input_mode, self.focus) {
            (_, InputMode::Search, _) => "Enter/Esc done | Backspace delete",
            (LoadPhase::Loaded, _, Focus::Series) => {
                "↑↓ series | Tab chapters | / search | q quit"
            }
            (LoadPhase::Loaded, _, Focus::Chapters) => {
                "↑↓ move | Enter select | [ ] series | / search | y copy | q quit"
            }
            _ => "q quit",
        }
    }

    pub fn scroll_log_up(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_add(lines);
    }

    pub fn scroll_log_down(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
    }

    pub fn log_info(&mut self, message: String) {
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: String) {
        self.push_log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: String) {
        self.push_log(LogLevel::Error, message);
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        if self.log_scroll > 0 {
            self.log_scroll = self.log_scroll.saturating_add(1);
        }

        if let Some(path) = &self.log_path {
            let _ = append_log_file(path, level, &message);
        }

        self.logs.push(LogEntry { level, message });

        if self.logs.len() > LOG_CAPACITY {
            let overflow = self.logs.len() - LOG_CAPACITY;
            self.logs.drain(0..overflow);
            self.log_scroll = self.log_scroll.saturating_sub(overflow);
        }
    }
}

pub fn log_level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    }
}

pub fn append_log_file(path: &Path, level: LogLevel, message: &str) -> std::io::Result<()> {
    let label = log_level_label(level);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{} [{label}] {message}", timestamp())
}

fn timestamp() -> String {
    let format = time::macros::format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
    );
    time::OffsetDateTime::now_utc()
        .format(format)
        .unwrap_or_default()
}
