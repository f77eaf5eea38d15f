//! Terminal rendering of the engine's UI calls.

use colored::Colorize;
use ghostpixel_core::message::{Message, MessageRole};
use ghostpixel_core::ui::UiSurface;
use ghostpixel_core::workspace::WorkspaceEntry;
use std::sync::{Mutex, MutexGuard};

/// Tracks what is already on screen.
///
/// The engine redraws the whole log on every emission (clear, then append
/// each message). A terminal cannot erase, so a redraw that repeats what is
/// already printed is swallowed and only the new tail is shown. A redraw
/// that diverges (another workspace) starts a fresh section.
#[derive(Debug, Default)]
pub struct LogView {
    shown: Vec<Message>,
    cursor: usize,
}

pub enum LogLine<'a> {
    Section,
    Message(&'a Message),
}

impl LogView {
    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    /// Returns what has to be printed for this append.
    pub fn append<'a>(&mut self, message: &'a Message) -> Vec<LogLine<'a>> {
        if self.shown.get(self.cursor) == Some(message) {
            self.cursor += 1;
            return Vec::new();
        }

        let mut lines = Vec::new();
        if self.cursor < self.shown.len() {
            lines.push(LogLine::Section);
        }
        self.shown.truncate(self.cursor);
        self.shown.push(message.clone());
        self.cursor += 1;
        lines.push(LogLine::Message(message));
        lines
    }
}

#[derive(Default)]
struct TerminalState {
    log: LogView,
    active: Option<(String, String)>,
}

/// `UiSurface` printing to stdout with colors.
#[derive(Default)]
pub struct TerminalUi {
    state: Mutex<TerminalState>,
}

impl TerminalUi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TerminalState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Prints a numbered workspace list with the active entry marked.
pub fn print_workspaces(entries: &[WorkspaceEntry]) {
    for (index, entry) in entries.iter().enumerate() {
        let line = format!("{:>3}. {}", index + 1, entry.workspace.name);
        if entry.is_active {
            println!("{} {}", "●".bright_green(), line.bright_green().bold());
        } else {
            println!("  {}", line);
        }
    }
}

fn print_message(message: &Message) {
    match message.role {
        MessageRole::User => {
            println!("{}", format!("> {}", message.content).green());
        }
        MessageRole::Assistant => {
            for line in message.content.lines() {
                println!("{}", line.bright_blue());
            }
            println!();
        }
    }
}

impl UiSurface for TerminalUi {
    fn render_workspaces(&self, entries: &[WorkspaceEntry]) {
        let Some(active) = entries.iter().find(|entry| entry.is_active) else {
            return;
        };
        let current = (active.workspace.id.clone(), active.workspace.name.clone());

        let mut state = self.lock();
        if state.active.as_ref() != Some(&current) {
            println!(
                "{}",
                format!("── {} ──", active.workspace.name).bright_magenta().bold()
            );
            state.active = Some(current);
        }
    }

    fn clear_messages(&self) {
        self.lock().log.clear();
    }

    fn append_message(&self, message: &Message) {
        let mut state = self.lock();
        for line in state.log.append(message) {
            match line {
                LogLine::Section => println!("{}", "···".bright_black()),
                LogLine::Message(message) => print_message(message),
            }
        }
    }

    fn set_busy(&self, busy: bool) {
        if busy {
            println!("{}", "thinking…".bright_black().italic());
        }
    }
}
