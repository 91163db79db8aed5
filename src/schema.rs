//! Retention schema resolution
//!
//! Maps a series name to its sampling step via an ordered list of
//! (pattern, step) rules, graphite storage-schemas style. The first rule
//! whose regex matches the full name wins; when nothing matches, a
//! configurable default step applies. Resolution is infallible.

use crate::error::PatternError;
use regex::Regex;
use tracing::debug;

/// A single ordered retention rule
#[derive(Debug, Clone)]
pub struct SchemaRule {
    /// Compiled name matcher
    pub pattern: Regex,
    /// Step in seconds for names this rule matches
    pub step: i64,
}

impl SchemaRule {
    /// Compile a rule from regex source
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidPattern`] when the regex does not parse
    /// or the step is not positive.
    pub fn new(pattern: &str, step: i64) -> Result<Self, PatternError> {
        if step <= 0 {
            return Err(PatternError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: format!("step must be positive, got {}", step),
            });
        }
        let regex = Regex::new(pattern).map_err(|e| PatternError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pattern: regex,
            step,
        })
    }
}

/// Ordered first-match-wins step resolver
///
/// The rule list is immutable after construction; concurrent resolution is
/// safe without locking.
#[derive(Debug, Clone)]
pub struct SchemaResolver {
    rules: Vec<SchemaRule>,
    default_step: i64,
}

impl SchemaResolver {
    /// Create a resolver from an ordered rule list and a fallback step
    pub fn new(rules: Vec<SchemaRule>, default_step: i64) -> Self {
        Self {
            rules,
            default_step,
        }
    }

    /// Create a resolver with no rules; everything resolves to the default
    pub fn with_default(default_step: i64) -> Self {
        Self::new(Vec::new(), default_step)
    }

    /// Resolve the step for a series name
    ///
    /// Linear scan in rule order; the first matching rule's step is returned,
    /// otherwise the default. Always returns a value.
    pub fn resolve(&self, name: &str) -> i64 {
        for rule in &self.rules {
            if rule.pattern.is_match(name) {
                debug!(series = name, step = rule.step, "schema rule matched");
                return rule.step;
            }
        }
        self.default_step
    }

    /// The fallback step applied when no rule matches
    pub fn default_step(&self) -> i64 {
        self.default_step
    }
}
