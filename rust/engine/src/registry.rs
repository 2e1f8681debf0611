use crate::errors::GameError;
use crate::rps::RockPaperScissors;
use crate::rules::GameRule;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lookup table from game name to its [`GameRule`].
///
/// Populated once at startup and then handed to the session manager, which
/// resolves the rule for each new session by name.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<dyn GameRule>>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in rule.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(RockPaperScissors::new());
        registry
    }

    /// Adds `rule` under its own name, replacing any rule already registered
    /// with that name.
    pub fn register<R>(&mut self, rule: R) -> &mut Self
    where
        R: GameRule + 'static,
    {
        self.rules.insert(rule.name().to_string(), Arc::new(rule));
        self
    }

    /// Finds the rule registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownGameType`] when nothing is registered under
    /// `name`, including the empty name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn GameRule>, GameError> {
        self.rules
            .get(name)
            .cloned()
            .ok_or_else(|| GameError::UnknownGameType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Registered names in ascending order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rules.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}
