//! Command capability interface and the static registry.
//!
//! Each command is an opaque capability behind the [`Command`] trait: a name,
//! a natural-language description (fed verbatim to the intent classifier),
//! a declared parameter schema, and an async handler. The registry is built
//! once at startup and read-only afterwards.

pub mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CommandError;

/// Value type accepted by a parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// One named, typed parameter slot in a command's schema.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParameterKind,
    pub required: bool,
    pub description: &'static str,
}

impl ParameterSpec {
    pub fn required(name: &'static str, kind: ParameterKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub fn optional(name: &'static str, kind: ParameterKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }
}

/// Parameter values extracted by the classifier, keyed by slot name.
pub type ParameterMap = HashMap<String, Value>;

/// Capability implemented by every registered command.
#[async_trait]
pub trait Command: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &'static str;

    /// Natural-language description shown to the classifier and to users.
    fn description(&self) -> &'static str;

    /// Ordered parameter schema. Empty by default.
    fn parameters(&self) -> &[ParameterSpec] {
        &[]
    }

    /// Run the command with extracted parameters.
    async fn invoke(&self, parameters: &ParameterMap) -> Result<String, CommandError>;
}

/// Static catalog of available commands.
///
/// Insertion order is meaningful: the classifier breaks confidence ties by
/// registry order, so register the most commonly wanted commands first.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
    index: HashMap<&'static str, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in commands.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(builtin::TimeCommand));
        registry.register(Arc::new(builtin::RandomNumberCommand));
        registry.register(Arc::new(builtin::EchoCommand));
        registry
    }

    /// Register a command. A command with the same name replaces the
    /// previous one, keeping its registry position.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        let name = command.name();
        match self.index.get(name) {
            Some(&position) => self.commands[position] = command,
            None => {
                self.index.insert(name, self.commands.len());
                self.commands.push(command);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.index.get(name).map(|&position| &self.commands[position])
    }

    /// Position in registration order, used for classifier tie-breaks.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Command>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubCommand {
        name: &'static str,
    }

    #[async_trait]
    impl Command for StubCommand {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "stub"
        }

        async fn invoke(&self, _parameters: &ParameterMap) -> Result<String, CommandError> {
            Ok("stub output".to_string())
        }
    }

    #[test]
    fn registration_keeps_insertion_order() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(StubCommand { name: "first" }));
        registry.register(Arc::new(StubCommand { name: "second" }));

        assert_eq!(registry.position("first"), Some(0));
        assert_eq!(registry.position("second"), Some(1));
        let names: Vec<&str> = registry.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn reregistration_replaces_in_place() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(StubCommand { name: "first" }));
        registry.register(Arc::new(StubCommand { name: "second" }));
        registry.register(Arc::new(StubCommand { name: "first" }));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.position("first"), Some(0));
    }

    #[test]
    fn builtins_are_registered() {
        let registry = CommandRegistry::with_builtins();
        assert!(registry.contains("get_time"));
        assert!(registry.contains("random_number"));
        assert!(registry.contains("echo"));
    }
}
