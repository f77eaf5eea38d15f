use async_trait::async_trait;
use colored::Colorize;
use ghostpixel_core::prompt::{PromptKind, PromptResponse, Prompter};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Asks on the terminal with a throwaway line editor.
///
/// Ctrl-C, Ctrl-D and a blank line all count as cancellation.
pub struct TerminalPrompter;

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn request(&self, kind: PromptKind) -> PromptResponse {
        let label = format!("{}: ", kind.label());
        let answer = tokio::task::spawn_blocking(move || {
            let mut editor = DefaultEditor::new()?;
            editor.readline(&label)
        })
        .await;

        match answer {
            Ok(Ok(line)) => PromptResponse::Value(line),
            Ok(Err(ReadlineError::Interrupted | ReadlineError::Eof)) => {
                println!("{}", "Cancelled.".bright_black());
                PromptResponse::Cancelled
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "Prompt failed");
                PromptResponse::Cancelled
            }
            Err(err) => {
                tracing::warn!(error = %err, "Prompt task failed");
                PromptResponse::Cancelled
            }
        }
    }
}
