use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use ghostpixel_application::{AppDependencies, ChatOutcome, GhostPixelApp, IgnoreReason};
use ghostpixel_core::error::GhostError;
use ghostpixel_infrastructure::{
    ConfigService, FilePreferences, GhostPaths, LocalDocumentStore, LocalIdentityProvider,
};
use ghostpixel_interaction::GeminiCompletionProvider;

mod logging;
mod prompter;
mod ui;

use prompter::TerminalPrompter;
use ui::TerminalUi;

const COMMANDS: &[&str] = &["/workspaces", "/new", "/rename", "/switch", "/key", "/reconnect"];

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|cmd| cmd.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// A parsed REPL line.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Quit,
    Workspaces,
    New,
    Rename(usize),
    Switch(usize),
    Key,
    Reconnect,
    Chat(&'a str),
    Invalid(&'static str),
}

fn parse_command(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    if trimmed == "quit" || trimmed == "exit" {
        return Command::Quit;
    }
    if !trimmed.starts_with('/') {
        return Command::Chat(line);
    }

    let mut parts = trimmed.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let index = parts.next().and_then(|n| n.parse::<usize>().ok());
    match (name, index) {
        ("/workspaces", _) => Command::Workspaces,
        ("/new", _) => Command::New,
        ("/key", _) => Command::Key,
        ("/reconnect", _) => Command::Reconnect,
        ("/rename", Some(n)) if n > 0 => Command::Rename(n),
        ("/switch", Some(n)) if n > 0 => Command::Switch(n),
        ("/rename", _) => Command::Invalid("Usage: /rename <n>"),
        ("/switch", _) => Command::Invalid("Usage: /switch <n>"),
        _ => Command::Invalid("Unknown command"),
    }
}

/// Workspace id for a 1-based index into the current list.
fn workspace_at(app: &GhostPixelApp, index: usize) -> Option<String> {
    app.workspaces()
        .get(index - 1)
        .map(|entry| entry.workspace.id.clone())
}

fn report(err: &GhostError) {
    eprintln!("{}", format!("Error: {}", err).red());
}

/// Runs one REPL command. Returns `false` when the loop should end.
async fn dispatch(app: &GhostPixelApp, command: Command<'_>) -> bool {
    match command {
        Command::Quit => {
            println!("{}", "Goodbye!".bright_green());
            return false;
        }
        Command::Workspaces => ui::print_workspaces(&app.workspaces()),
        Command::New => match app.create_workspace(None).await {
            Ok(Some(workspace)) => {
                println!("{}", format!("Created '{}'.", workspace.name).green());
            }
            Ok(None) => {}
            Err(e) => report(&e),
        },
        Command::Rename(n) => match workspace_at(app, n) {
            Some(id) => {
                if let Err(e) = app.rename_workspace(&id, None).await {
                    report(&e);
                }
            }
            None => println!("{}", format!("No workspace #{n}.").yellow()),
        },
        Command::Switch(n) => match workspace_at(app, n) {
            Some(id) => {
                if let Err(e) = app.select_workspace(&id).await {
                    report(&e);
                }
            }
            None => println!("{}", format!("No workspace #{n}.").yellow()),
        },
        Command::Key => {
            let answer = tokio::task::spawn_blocking(|| {
                let mut editor = rustyline::DefaultEditor::new()?;
                editor.readline("New Gemini API key: ")
            })
            .await;
            if let Ok(Ok(key)) = answer {
                match app.set_credential(&key).await {
                    Ok(()) => println!("{}", "API key saved.".green()),
                    Err(e) => report(&e),
                }
            }
        }
        Command::Reconnect => match app.reconnect().await {
            Ok(()) => println!("{}", "Reconnected.".green()),
            Err(e) => report(&e),
        },
        Command::Chat(input) => match app.submit(input).await {
            Ok(ChatOutcome::Ignored(IgnoreReason::NoActiveWorkspace)) => {
                println!("{}", "No active workspace yet.".yellow());
            }
            Ok(ChatOutcome::Ignored(IgnoreReason::CredentialDeclined)) => {
                println!("{}", "An API key is required to chat.".yellow());
            }
            Ok(_) => {}
            Err(e) => report(&e),
        },
        Command::Invalid(message) => println!("{}", message.bright_black()),
    }
    true
}

/// The main entry point for the GhostPixel readline client.
///
/// 1. Resolves paths and installs file logging
/// 2. Loads config.toml and wires the file-backed adapters into the engine
/// 3. Authenticates (fatal on failure) and starts live synchronization
/// 4. Reads commands and chat input until `quit`
#[tokio::main]
async fn main() -> Result<()> {
    // ===== Bootstrap =====
    let paths = GhostPaths::new(None);
    let _log_guard = logging::init(&paths)?;

    let config = ConfigService::new(&paths)?.load()?;
    tracing::info!(namespace = %config.namespace, model = %config.completion.model, "[Bootstrap] Config loaded");

    let ui = Arc::new(TerminalUi::new());
    let app = GhostPixelApp::new(
        config.clone(),
        AppDependencies {
            identity: Arc::new(LocalIdentityProvider::new(&paths)?),
            store: Arc::new(LocalDocumentStore::open_default(&paths)?),
            preferences: Arc::new(FilePreferences::new(&paths)?),
            provider: Arc::new(GeminiCompletionProvider::new(&config.completion)?),
            prompter: Arc::new(TerminalPrompter),
            ui,
        },
    );

    println!("{}", "=== GhostPixel ===".bright_magenta().bold());
    let session = match app.start().await {
        Ok(session) => session,
        Err(e) => {
            report(&e);
            return Err(e.into());
        }
    };
    tracing::info!(subject_id = %session.subject_id, "[Bootstrap] Ready");
    println!(
        "{}",
        "Type a message to chat. Commands: /workspaces, /new, /rename <n>, /switch <n>, /key, /reconnect, quit."
            .bright_black()
    );
    println!();

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    // ===== Main REPL Loop =====
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if !dispatch(&app, parse_command(&line)).await {
                    break;
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    app.shutdown();
    Ok(())
}
