//! Command execution with schema validation.

use tracing::{info, warn};

use crate::commands::{Command, ParameterMap};
use crate::error::CommandError;

/// Transient result of one command execution. One outbound reply is sent
/// per result, success or failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub success: bool,
    pub output_text: Option<String>,
    pub error_detail: Option<String>,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output_text: Some(output.into()),
            error_detail: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            output_text: None,
            error_detail: Some(detail.into()),
        }
    }
}

/// Run a command with extracted parameters.
///
/// Required slots are checked up front; a missing one fails the execution
/// without invoking the handler. Handler errors are captured into the
/// result, never propagated.
pub async fn execute(command: &dyn Command, parameters: &ParameterMap) -> ExecutionResult {
    for spec in command.parameters() {
        if spec.required && !parameters.contains_key(spec.name) {
            let error = CommandError::MissingParameter {
                name: command.name().to_string(),
                parameter: spec.name.to_string(),
            };
            warn!(command = command.name(), parameter = spec.name, "missing required parameter");
            return ExecutionResult::failure(error.to_string());
        }
    }

    match command.invoke(parameters).await {
        Ok(output) => {
            info!(command = command.name(), "command executed");
            ExecutionResult::success(output)
        }
        Err(error) => {
            warn!(command = command.name(), %error, "command failed");
            ExecutionResult::failure(error.to_string())
        }
    }
}
