//! Error types for Alfred.

use std::time::Duration;

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

/// Configuration-related errors.
///
/// These are the only fatal errors in the system: they are raised while
/// loading configuration at startup and never at request time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel/transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send reply in chat {chat_id}: {reason}")]
    SendFailed { chat_id: i64, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Channel I/O error: {0}")]
    Io(String),
}

/// LLM backend errors.
///
/// The agent treats any of these as "classification unavailable": the update
/// is answered with a generic service-unavailable reply and nothing is
/// retried here. Retry and rate-limit policy belong to the backend client's
/// own HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned status {status}: {body}")]
    BadStatus {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// Command execution errors.
///
/// Never propagated past the executor: every variant is converted into a
/// failed `ExecutionResult` and surfaced to the user as a reply.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command {name} not found")]
    NotFound { name: String },

    #[error("Command {name} is missing required parameter '{parameter}'")]
    MissingParameter { name: String, parameter: String },

    #[error("Invalid value for parameter '{parameter}' of command {name}: {reason}")]
    InvalidParameter {
        name: String,
        parameter: String,
        reason: String,
    },

    #[error("Command {name} failed: {reason}")]
    Failed { name: String, reason: String },
}
