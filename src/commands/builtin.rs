//! Built-in commands.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde_json::Value;

use super::{Command, ParameterKind, ParameterMap, ParameterSpec};
use crate::error::CommandError;

/// Read an integer slot, accepting both JSON numbers and numeric strings.
/// Classifiers are not reliable about which of the two they emit.
fn integer_parameter(
    command: &'static str,
    parameters: &ParameterMap,
    name: &'static str,
) -> Result<Option<i64>, CommandError> {
    let Some(value) = parameters.get(name) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) => Ok(Some(n)),
        None => Err(CommandError::InvalidParameter {
            name: command.to_string(),
            parameter: name.to_string(),
            reason: format!("expected an integer, got {value}"),
        }),
    }
}

/// Report the current date and time.
#[derive(Debug, Default)]
pub struct TimeCommand;

#[async_trait]
impl Command for TimeCommand {
    fn name(&self) -> &'static str {
        "get_time"
    }

    fn description(&self) -> &'static str {
        "Get the current date and time"
    }

    async fn invoke(&self, _parameters: &ParameterMap) -> Result<String, CommandError> {
        let now = Utc::now();
        Ok(format!("Current time: {}", now.format("%Y-%m-%d %H:%M:%S UTC")))
    }
}

/// Generate a random number in an inclusive range.
#[derive(Debug, Default)]
pub struct RandomNumberCommand;

const RANDOM_PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec {
        name: "min",
        kind: ParameterKind::Integer,
        required: false,
        description: "Lower bound, inclusive (default 1)",
    },
    ParameterSpec {
        name: "max",
        kind: ParameterKind::Integer,
        required: false,
        description: "Upper bound, inclusive (default 100)",
    },
];

#[async_trait]
impl Command for RandomNumberCommand {
    fn name(&self) -> &'static str {
        "random_number"
    }

    fn description(&self) -> &'static str {
        "Generate a random number between min and max (default 1-100)"
    }

    fn parameters(&self) -> &[ParameterSpec] {
        RANDOM_PARAMETERS
    }

    async fn invoke(&self, parameters: &ParameterMap) -> Result<String, CommandError> {
        let mut min = integer_parameter(self.name(), parameters, "min")?.unwrap_or(1);
        let mut max = integer_parameter(self.name(), parameters, "max")?.unwrap_or(100);
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }
        let number = rand::thread_rng().gen_range(min..=max);
        Ok(format!("Random number: {number}"))
    }
}

/// Echo a message back to the user.
#[derive(Debug, Default)]
pub struct EchoCommand;

const ECHO_PARAMETERS: &[ParameterSpec] = &[ParameterSpec {
    name: "message",
    kind: ParameterKind::String,
    required: true,
    description: "Text to repeat back",
}];

#[async_trait]
impl Command for EchoCommand {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Echo back a message or text"
    }

    fn parameters(&self) -> &[ParameterSpec] {
        ECHO_PARAMETERS
    }

    async fn invoke(&self, parameters: &ParameterMap) -> Result<String, CommandError> {
        let message = match parameters.get("message") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                return Err(CommandError::MissingParameter {
                    name: self.name().to_string(),
                    parameter: "message".to_string(),
                });
            }
        };
        Ok(format!("Echo: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> ParameterMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn get_time_reports_a_timestamp() {
        let output = TimeCommand.invoke(&ParameterMap::new()).await.unwrap();
        assert!(output.starts_with("Current time: "));
    }

    #[tokio::test]
    async fn random_number_respects_bounds() {
        let parameters = params(&[("min", json!(5)), ("max", json!(5))]);
        let output = RandomNumberCommand.invoke(&parameters).await.unwrap();
        assert_eq!(output, "Random number: 5");
    }

    #[tokio::test]
    async fn random_number_swaps_inverted_bounds() {
        let parameters = params(&[("min", json!(9)), ("max", json!(3))]);
        let output = RandomNumberCommand.invoke(&parameters).await.unwrap();
        let number: i64 = output
            .strip_prefix("Random number: ")
            .unwrap()
            .parse()
            .unwrap();
        assert!((3..=9).contains(&number));
    }

    #[tokio::test]
    async fn random_number_accepts_numeric_strings() {
        let parameters = params(&[("min", json!("7")), ("max", json!("7"))]);
        let output = RandomNumberCommand.invoke(&parameters).await.unwrap();
        assert_eq!(output, "Random number: 7");
    }

    #[tokio::test]
    async fn random_number_rejects_non_numeric_bound() {
        let parameters = params(&[("min", json!("plenty"))]);
        let err = RandomNumberCommand.invoke(&parameters).await.unwrap_err();
        assert!(matches!(err, CommandError::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn echo_repeats_the_message() {
        let parameters = params(&[("message", json!("good evening"))]);
        let output = EchoCommand.invoke(&parameters).await.unwrap();
        assert_eq!(output, "Echo: good evening");
    }

    #[tokio::test]
    async fn echo_without_message_is_a_missing_parameter() {
        let err = EchoCommand.invoke(&ParameterMap::new()).await.unwrap_err();
        assert!(matches!(err, CommandError::MissingParameter { .. }));
    }
}
