//! LLM-backed intent classification.
//!
//! Builds a prompt from the command catalog plus the literal utterance and
//! asks the backend for a ranked JSON list of matches. Parsing is defensive:
//! a malformed entry costs that one candidate, never the whole call. Only a
//! failed backend call is an error, and the caller turns that into a
//! service-unavailable reply rather than a match.

use std::cmp::Reverse;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::commands::{CommandRegistry, ParameterMap};
use crate::error::LlmError;
use crate::llm::CompletionBackend;

/// One classifier guess for an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub command_name: String,
    /// 0-100, clamped at parse time.
    pub confidence: u8,
    #[serde(default)]
    pub parameters: ParameterMap,
}

const SYSTEM_PROMPT: &str = "You are Alfred, a polite assistant bot that maps chat messages onto a \
fixed set of commands. You only ever pick commands from the provided list, \
and you respond with the requested JSON and nothing else.";

pub struct IntentClassifier {
    backend: Arc<dyn CompletionBackend>,
}

impl IntentClassifier {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Classify an utterance against the registry.
    ///
    /// Returns candidates ordered by descending confidence, ties broken by
    /// registry order. An empty list means nothing matched; an error means
    /// the backend itself was unreachable or unusable.
    pub async fn classify(
        &self,
        utterance: &str,
        registry: &CommandRegistry,
    ) -> Result<Vec<Candidate>, LlmError> {
        let prompt = build_prompt(utterance, registry);
        let response = self.backend.complete(SYSTEM_PROMPT, &prompt).await?;
        debug!(raw = %response, "classifier response");
        Ok(parse_candidates(&response, registry))
    }
}

fn build_prompt(utterance: &str, registry: &CommandRegistry) -> String {
    let mut prompt = String::from("Available commands:\n");
    for command in registry.iter() {
        let _ = write!(prompt, "- {}: {}", command.name(), command.description());
        let parameters = command.parameters();
        if !parameters.is_empty() {
            let slots: Vec<String> = parameters
                .iter()
                .map(|p| {
                    format!(
                        "{} ({}, {})",
                        p.name,
                        p.kind.as_str(),
                        if p.required { "required" } else { "optional" }
                    )
                })
                .collect();
            let _ = write!(prompt, " [parameters: {}]", slots.join(", "));
        }
        prompt.push('\n');
    }

    let _ = write!(
        prompt,
        "\nUser message: \"{utterance}\"\n\n\
         For every command that could satisfy the message, give an integer \
         confidence from 0 (no match) to 100 (certain match) and any parameter \
         values found in the message. Leave out commands that clearly do not \
         apply.\n\n\
         Respond in JSON format:\n\
         {{\"commands\": [{{\"name\": \"<command>\", \"confidence\": <0-100>, \
         \"parameters\": {{}}}}]}}"
    );
    prompt
}

/// Pull the JSON object out of a response that may carry surrounding prose.
fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

/// Parse the backend's response into candidates, dropping anything
/// malformed and ranking the survivors.
fn parse_candidates(response: &str, registry: &CommandRegistry) -> Vec<Candidate> {
    let Some(json) = extract_json(response) else {
        warn!("classifier response contained no JSON object");
        return Vec::new();
    };
    let value: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(error) => {
            warn!(%error, "classifier response was not valid JSON");
            return Vec::new();
        }
    };
    let Some(entries) = value.get("commands").and_then(Value::as_array) else {
        warn!("classifier response had no 'commands' array");
        return Vec::new();
    };

    let mut candidates: Vec<Candidate> = Vec::new();
    for entry in entries {
        let Some(name) = entry.get("name").and_then(Value::as_str) else {
            warn!("dropping candidate without a name");
            continue;
        };
        if !registry.contains(name) {
            warn!(command = name, "dropping candidate for unknown command");
            continue;
        }
        let Some(confidence) = parse_confidence(entry.get("confidence")) else {
            warn!(command = name, "dropping candidate without a numeric confidence");
            continue;
        };
        let parameters: ParameterMap = entry
            .get("parameters")
            .and_then(Value::as_object)
            .map(|object| {
                object
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let candidate = Candidate {
            command_name: name.to_string(),
            confidence,
            parameters,
        };
        // A duplicated command name keeps its most confident entry.
        match candidates
            .iter()
            .position(|existing| existing.command_name == name)
        {
            Some(position) => {
                if candidates[position].confidence < candidate.confidence {
                    candidates[position] = candidate;
                }
            }
            None => candidates.push(candidate),
        }
    }

    candidates.sort_by_key(|c| {
        (
            Reverse(c.confidence),
            registry.position(&c.command_name).unwrap_or(usize::MAX),
        )
    });
    candidates
}

/// Accept integers, floats, and numeric strings; clamp to 0-100.
fn parse_confidence(value: Option<&Value>) -> Option<u8> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.clamp(0.0, 100.0).round() as u8)
}
