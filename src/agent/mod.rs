//! Natural-language agent: classification, confirmation, execution.
//!
//! `Agent::handle_update` is the entry point a transport layer calls once
//! per addressed inbound message. Flow: any open pending action for the
//! sender is resolved first; a reply that doesn't address it falls through
//! to a fresh classification, whose decision either executes a command
//! immediately or opens a new pending action awaiting confirmation.

pub mod classifier;
pub mod executor;
pub mod ledger;
pub mod policy;

pub use classifier::{Candidate, IntentClassifier};
pub use executor::{ExecutionResult, execute};
pub use ledger::{Clock, Outcome, PendingAction, PendingActionLedger, SystemClock};
pub use policy::{Decision, Thresholds, decide};

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::channels::{ChatKey, IncomingMessage, Messenger};
use crate::commands::CommandRegistry;
use crate::llm::CompletionBackend;

const UNAVAILABLE_REPLY: &str =
    "I couldn't process your request right now. Please try again in a moment.";
const EXPIRED_REPLY: &str = "That request expired. Please ask again.";
const CANCELLED_REPLY: &str = "Understood, request cancelled.";

pub struct Agent {
    registry: Arc<CommandRegistry>,
    classifier: IntentClassifier,
    ledger: PendingActionLedger,
    messenger: Arc<dyn Messenger>,
    thresholds: Thresholds,
    pending_ttl: Duration,
}

impl Agent {
    pub fn new(
        registry: Arc<CommandRegistry>,
        backend: Arc<dyn CompletionBackend>,
        messenger: Arc<dyn Messenger>,
        thresholds: Thresholds,
        pending_ttl: Duration,
    ) -> Self {
        Self {
            registry,
            classifier: IntentClassifier::new(backend),
            ledger: PendingActionLedger::with_system_clock(),
            messenger,
            thresholds,
            pending_ttl,
        }
    }

    /// Swap the ledger clock. Call before handling any updates.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ledger = PendingActionLedger::new(clock);
        self
    }

    pub fn ledger(&self) -> &PendingActionLedger {
        &self.ledger
    }

    /// Handle one addressed inbound update end to end.
    ///
    /// Sends exactly one reply. All failures are contained here: a bad
    /// classification, a failing handler, or an undeliverable reply never
    /// affects other updates or the ledger state of other keys.
    pub async fn handle_update(&self, message: &IncomingMessage) {
        let reply = self.process(message).await;
        if let Err(error) = self
            .messenger
            .send_reply(message.chat_id, message.message_id, &reply)
            .await
        {
            warn!(chat_id = message.chat_id, %error, "failed to deliver reply");
        }
    }

    async fn process(&self, message: &IncomingMessage) -> String {
        let key = ChatKey::from(message);

        match self.ledger.resolve(key, &message.text).await {
            Outcome::Confirmed(candidate) => {
                info!(command = %candidate.command_name, "pending action confirmed");
                return self.run_command(&candidate).await;
            }
            Outcome::Selected(candidate) => {
                info!(command = %candidate.command_name, "pending action selected");
                return self.run_command(&candidate).await;
            }
            Outcome::Cancelled => return CANCELLED_REPLY.to_string(),
            Outcome::Expired => return EXPIRED_REPLY.to_string(),
            // Either nothing was pending or the reply didn't address it;
            // treat the text as a fresh utterance.
            Outcome::NotFound => {}
        }

        let candidates = match self.classifier.classify(&message.text, &self.registry).await {
            Ok(candidates) => candidates,
            Err(error) => {
                warn!(%error, "classification unavailable");
                return UNAVAILABLE_REPLY.to_string();
            }
        };

        match decide(&candidates, self.thresholds) {
            Decision::AutoExecute(candidate) => {
                info!(
                    command = %candidate.command_name,
                    confidence = candidate.confidence,
                    "auto-executing"
                );
                self.run_command(&candidate).await
            }
            Decision::Confirm(candidate) => {
                let reply = confirm_reply(&candidate);
                self.ledger.open(key, vec![candidate], self.pending_ttl).await;
                reply
            }
            Decision::Clarify(candidates) => {
                let reply = clarify_reply(&candidates);
                self.ledger.open(key, candidates, self.pending_ttl).await;
                reply
            }
            Decision::NoMatch => no_match_reply(&self.registry),
        }
    }

    async fn run_command(&self, candidate: &Candidate) -> String {
        let Some(command) = self.registry.get(&candidate.command_name) else {
            // The registry is static, so this means the candidate escaped
            // classifier filtering somehow.
            warn!(command = %candidate.command_name, "resolved candidate has no registered command");
            return format!("Command '{}' is not available.", candidate.command_name);
        };

        let result = executor::execute(command.as_ref(), &candidate.parameters).await;
        match (result.success, result.output_text, result.error_detail) {
            (true, Some(output), _) => output,
            (_, _, Some(detail)) => {
                format!("I couldn't run '{}': {detail}", candidate.command_name)
            }
            _ => format!("I couldn't run '{}'.", candidate.command_name),
        }
    }
}

fn confirm_reply(candidate: &Candidate) -> String {
    format!(
        "I understood your request as '{}' ({}% confident). Reply 'yes' to run it, or 'no' to cancel.",
        candidate.command_name, candidate.confidence
    )
}

fn clarify_reply(candidates: &[Candidate]) -> String {
    let mut reply = String::from("Your request could match more than one command:\n");
    for (position, candidate) in candidates.iter().enumerate() {
        let _ = writeln!(
            reply,
            "{}. {} ({}%)",
            position + 1,
            candidate.command_name,
            candidate.confidence
        );
    }
    reply.push_str("Reply with the number or the command name, or 'no' to cancel.");
    reply
}

fn no_match_reply(registry: &CommandRegistry) -> String {
    let mut reply = String::from(
        "I couldn't match that to anything I can do. Available commands:\n",
    );
    for command in registry.iter() {
        let _ = writeln!(reply, "- {}: {}", command.name(), command.description());
    }
    reply.push_str("Please rephrase your request.");
    reply
}
