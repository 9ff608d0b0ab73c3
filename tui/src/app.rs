use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use scholia_core::{ChatEngine, EngineEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

const TOAST_TTL: Duration = Duration::from_secs(6);

const HELP_TEXT: &str = "/upload - paste a document for ingestion\n\
    /clear - start a new conversation\n\
    /quit - exit";

/// Ephemeral, auto-dismissing notification shown in the status area.
pub struct Toast {
    pub title: String,
    pub detail: String,
    raised_at: Instant,
}

impl Toast {
    fn new(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Toast {
            title: title.into(),
            detail: detail.into(),
            raised_at: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.raised_at.elapsed() > TOAST_TTL
    }
}

/// Freeform document text being assembled for ingestion.
pub struct UploadForm {
    pub buffer: String,
}

/// Input history for up/down arrow navigation
pub struct InputHistory {
    entries: Vec<String>,
    position: Option<usize>,
    draft: String,
}

impl InputHistory {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            position: None,
            draft: String::new(),
        }
    }

    fn push(&mut self, entry: String) {
        if !entry.is_empty() && self.entries.last() != Some(&entry) {
            self.entries.push(entry);
        }
        self.position = None;
        self.draft.clear();
    }

    /// Navigate to previous entry (up arrow)
    fn prev(&mut self, current_input: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }

        match self.position {
            None => {
                // Save current input as draft before navigating
                self.draft = current_input.to_string();
                self.position = Some(self.entries.len() - 1);
            }
            Some(pos) if pos > 0 => {
                self.position = Some(pos - 1);
            }
            _ => return None,
        }

        self.position.map(|p| self.entries[p].as_str())
    }

    /// Navigate to next entry (down arrow)
    fn next(&mut self) -> Option<&str> {
        match self.position {
            Some(pos) if pos + 1 < self.entries.len() => {
                self.position = Some(pos + 1);
                Some(&self.entries[pos + 1])
            }
            Some(_) => {
                self.position = None;
                Some(&self.draft)
            }
            None => None,
        }
    }

    fn reset_position(&mut self) {
        self.position = None;
        self.draft.clear();
    }
}

pub struct App {
    pub input: Input,
    pub engine: ChatEngine,
    pub chat_endpoint: String,
    pub history: InputHistory,
    pub scroll: crate::scroll::ScrollTracker,
    pub toast: Option<Toast>,
    pub upload: Option<UploadForm>,
    pub spinner_frame: usize,
    pub last_max_scroll: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(engine: ChatEngine, chat_endpoint: String) -> Self {
        App {
            input: Input::default(),
            engine,
            chat_endpoint,
            history: InputHistory::new(),
            scroll: crate::scroll::ScrollTracker::new(),
            toast: None,
            upload: None,
            spinner_frame: 0,
            last_max_scroll: 0,
            should_quit: false,
        }
    }

    pub fn spinner(&self) -> &'static str {
        const BRAILLE_FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];
        BRAILLE_FRAMES[self.spinner_frame % BRAILLE_FRAMES.len()]
    }

    /// Advance animation state and expire stale notifications. Called once
    /// per frame.
    pub fn tick(&mut self) {
        if self.engine.is_busy() {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
        }
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }

    /// Apply everything the engine produced since the last frame.
    pub fn drain_engine_events(&mut self) {
        while let Some(event) = self.engine.try_recv() {
            match event {
                // Transcript growth is re-read from the session at render
                // time; the scroll tracker holds or follows on its own.
                EngineEvent::Chunk(_)
                | EngineEvent::SourcesRecorded { .. }
                | EngineEvent::TurnComplete => {}
                EngineEvent::IngestComplete => {
                    self.toast = Some(Toast::new(
                        "Ingested",
                        "Document stored for retrieval. Ask away.",
                    ));
                }
                EngineEvent::SessionCleared => {
                    self.toast = Some(Toast::new("Cleared", "Started a new conversation."));
                }
                EngineEvent::Error(msg) => {
                    self.toast = Some(Toast::new("Error", msg));
                }
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.upload.is_some() {
            self.handle_upload_key(key);
            return;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL)
            | (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.open_upload();
            }
            (KeyCode::Enter, _) => {
                self.submit_input();
            }
            (KeyCode::Up, _) => {
                let current = self.input.value().to_string();
                if let Some(prev) = self.history.prev(&current) {
                    self.input = Input::from(prev.to_string());
                }
            }
            (KeyCode::Down, _) => {
                if let Some(next) = self.history.next() {
                    self.input = Input::from(next.to_string());
                }
            }
            (KeyCode::PageUp, _) => {
                self.scroll.scroll_up(10, self.last_max_scroll);
            }
            (KeyCode::PageDown, _) => {
                self.scroll.scroll_down(10, self.last_max_scroll);
            }
            (KeyCode::End, _) => {
                self.scroll.jump_to_bottom();
            }
            _ => {
                self.history.reset_position();
                self.input.handle_event(&Event::Key(key));
            }
        }
    }

    fn handle_upload_key(&mut self, key: KeyEvent) {
        let Some(form) = self.upload.as_mut() else {
            return;
        };
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => {
                self.upload = None;
            }
            (KeyCode::Char('s'), KeyModifiers::CONTROL) => {
                let text = std::mem::take(&mut form.buffer);
                self.upload = None;
                if text.trim().is_empty() {
                    self.toast = Some(Toast::new("Error", "Nothing to ingest."));
                } else {
                    self.engine.ingest(text);
                }
            }
            (KeyCode::Enter, _) => {
                form.buffer.push('\n');
            }
            (KeyCode::Backspace, _) => {
                form.buffer.pop();
            }
            (KeyCode::Char(c), m) if !m.contains(KeyModifiers::CONTROL) => {
                form.buffer.push(c);
            }
            _ => {}
        }
    }

    fn submit_input(&mut self) {
        let text = self.input.value().to_string();
        if text.trim().is_empty() {
            return;
        }
        if let Some(command) = text.strip_prefix('/') {
            self.input.reset();
            self.history.push(text.clone());
            self.run_command(command.trim());
            return;
        }
        // Submission while a reply is streaming is silently ignored and the
        // draft stays in the input box.
        if self.engine.is_busy() {
            return;
        }
        self.history.push(text.clone());
        self.input.reset();
        self.engine.submit(text);
    }

    fn run_command(&mut self, command: &str) {
        match command {
            "help" => {
                self.toast = Some(Toast::new("Commands", HELP_TEXT));
            }
            "upload" => {
                self.open_upload();
            }
            "clear" => {
                if self.engine.is_busy() {
                    self.toast = Some(Toast::new(
                        "Error",
                        "Cannot clear the conversation while a reply is streaming.",
                    ));
                } else {
                    self.engine.reset();
                }
            }
            "quit" => {
                self.should_quit = true;
            }
            other => {
                self.toast = Some(Toast::new(
                    "Error",
                    format!("Unknown command '/{}'. Try /help.", other),
                ));
            }
        }
    }

    fn open_upload(&mut self) {
        if !self.engine.ingest_available() {
            self.toast = Some(Toast::new(
                "Error",
                "Documents can only be uploaded before the conversation starts.",
            ));
            return;
        }
        self.upload = Some(UploadForm {
            buffer: String::new(),
        });
    }
}
