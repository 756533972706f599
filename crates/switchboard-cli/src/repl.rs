//! Interactive chat REPL.
//!
//! Every line goes through the same [`Dispatcher`] the gateway uses, so
//! `@prefixes` and session commands (`/new`, `/history`, ...) behave the
//! same here as on any other transport. Line editing and persistent
//! history come from `rustyline`.

use std::path::PathBuf;

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use switchboard_router::Dispatcher;

use crate::app::new_message_id;
use crate::helpers;

const HISTORY_LIMIT: usize = 1000;

/// What one line of input asks for.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Quit,
    Message(&'a str),
}

impl<'a> Line<'a> {
    fn classify(input: &'a str) -> Self {
        let text = input.trim();
        if text.is_empty() {
            return Line::Blank;
        }
        match text.to_ascii_lowercase().as_str() {
            "exit" | "quit" | "/exit" | "/quit" | ":q" => Line::Quit,
            _ => Line::Message(text),
        }
    }
}

struct Repl {
    dispatcher: Dispatcher,
    user_id: String,
    editor: DefaultEditor,
    history_file: PathBuf,
}

impl Repl {
    fn new(dispatcher: Dispatcher, user_id: &str) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        editor.set_max_history_size(HISTORY_LIMIT)?;
        editor.set_auto_add_history(false);

        let history_file = history_file();
        if editor.load_history(&history_file).is_ok() {
            debug!(path = %history_file.display(), "loaded chat history");
        }

        Ok(Self {
            dispatcher,
            user_id: user_id.to_string(),
            editor,
            history_file,
        })
    }

    fn prompt(&self) -> String {
        format!("{} › ", self.user_id)
    }

    async fn run(&mut self) {
        loop {
            let input = match self.editor.readline(&self.prompt()) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("Input error: {e}");
                    break;
                }
            };

            let text = match Line::classify(&input) {
                Line::Blank => continue,
                Line::Quit => {
                    println!("\nGoodbye! 👋");
                    break;
                }
                Line::Message(text) => text,
            };
            let _ = self.editor.add_history_entry(text);

            helpers::print_thinking();
            let reply = self
                .dispatcher
                .handle(text, &self.user_id, &new_message_id())
                .await;
            helpers::clear_thinking();

            // Locally minted ids are never duplicates.
            helpers::print_response(reply.as_deref().unwrap_or_default());
        }
    }

    fn save_history(&mut self) {
        if let Some(dir) = self.history_file.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = self.editor.save_history(&self.history_file) {
            debug!("could not save chat history: {e}");
        }
    }
}

/// Chat as `user_id` until Ctrl+C, Ctrl+D or an exit word.
pub async fn run(dispatcher: Dispatcher, user_id: &str) -> Result<()> {
    helpers::print_banner();
    let mut repl = Repl::new(dispatcher, user_id)?;
    repl.run().await;
    repl.save_history();
    Ok(())
}

fn history_file() -> PathBuf {
    switchboard_core::utils::get_data_path()
        .join("history")
        .join("chat_history")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
