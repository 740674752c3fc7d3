//! Interactive REPL channel for local development.
//!
//! Drives the agent from a terminal: each line becomes an addressed
//! [`IncomingMessage`] in a private chat, and replies print to stdout.
//! Uses rustyline for line editing and history.
//!
//! ## Commands
//!
//! - `/quit` or `/exit` - Exit the REPL
//! - anything else is handed to the agent as an utterance

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::agent::Agent;
use crate::channels::{IncomingMessage, Messenger, strip_addressing};
use crate::error::ChannelError;

/// Chat/user ids used for the local REPL conversation.
const REPL_CHAT_ID: i64 = 1;
const REPL_USER_ID: i64 = 1;

/// Messenger that prints replies to stdout.
#[derive(Debug, Default)]
pub struct StdoutMessenger;

impl StdoutMessenger {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Messenger for StdoutMessenger {
    async fn send_reply(
        &self,
        _chat_id: i64,
        _reply_to_message_id: i64,
        text: &str,
    ) -> Result<(), ChannelError> {
        println!("{text}");
        Ok(())
    }
}

fn history_path() -> Option<PathBuf> {
    let dir = dirs::home_dir()?.join(".alfred");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join("history"))
}

/// Run the REPL until `/quit` or EOF.
pub async fn run(agent: Arc<Agent>, bot_name: &str) -> Result<(), ChannelError> {
    let mut editor = DefaultEditor::new().map_err(|e| ChannelError::Io(e.to_string()))?;
    let history = history_path();
    if let Some(path) = &history {
        let _ = editor.load_history(path);
    }

    println!("{bot_name} is listening. Type a request, or /quit to exit.");

    let message_counter = AtomicI64::new(1);
    loop {
        // rustyline blocks; this loop owns its runtime thread anyway.
        let line = tokio::task::block_in_place(|| editor.readline("you> "));
        match line {
            Ok(line) => {
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                if text == "/quit" || text == "/exit" {
                    break;
                }
                let _ = editor.add_history_entry(text);

                // Users habitually address the bot by name even here.
                let utterance = strip_addressing(text, bot_name);
                if utterance.is_empty() {
                    continue;
                }
                let mut message = IncomingMessage::new(
                    REPL_CHAT_ID,
                    REPL_USER_ID,
                    message_counter.fetch_add(1, Ordering::Relaxed),
                    utterance,
                );
                // Private-chat semantics: everything is addressed to the bot.
                message.is_reply_to_bot = true;
                agent.handle_update(&message).await;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(error) => return Err(ChannelError::Io(error.to_string())),
        }
    }

    if let Some(path) = &history {
        let _ = editor.save_history(path);
    }
    Ok(())
}
