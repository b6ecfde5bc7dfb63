// ruleflow/src/pipeline/definition.rs

//! Contains the declarative rule model: `RuleDefinition`, `ConditionRef`, and
//! the two configuration documents (`RuleTable`, `RuleSequence`) they are read from.

use crate::config::duration_serde;
use crate::error::{LoadError, LoadResult, SourceKind};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Leading character of a condition reference that inverts its result.
pub const NEGATION_MARKER: char = '!';

/// A reference from a rule to a registered condition, with its own options.
///
/// The negation marker is parsed once, when the document is read; `name`
/// never carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionRef {
  pub name: String,
  pub options: Arc<Value>,
  pub negated: bool,
}

impl ConditionRef {
  /// Parses a reference as written in a rule document, e.g. `"!isPressureChannel"`.
  pub fn parse(reference: &str, options: Value) -> Self {
    let (name, negated) = match reference.strip_prefix(NEGATION_MARKER) {
      Some(name) => (name, true),
      None => (reference, false),
    };
    Self {
      name: name.to_string(),
      options: Arc::new(options),
      negated,
    }
  }
}

impl fmt::Display for ConditionRef {
  /// Formats the reference as written, including the negation marker.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.negated {
      write!(f, "{}{}", NEGATION_MARKER, self.name)
    } else {
      f.write_str(&self.name)
    }
  }
}

/// A named rule: one action, its options, its gating conditions and an
/// optional deadline. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
  pub name: String,
  pub operation: String,
  pub options: Arc<Value>,
  pub conditions: Vec<ConditionRef>,
  /// `None` falls back to the engine default. `Some(Duration::ZERO)` is an
  /// explicit deadline that has already expired.
  pub timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct RawConditionRef {
  #[serde(rename = "conditionName", alias = "functionName")]
  name: String,
  #[serde(default)]
  options: Value,
}

#[derive(Debug, Deserialize)]
struct RawRuleDefinition {
  #[serde(rename = "operationName", alias = "functionName")]
  operation: String,
  #[serde(default)]
  options: Value,
  #[serde(default)]
  conditions: Vec<RawConditionRef>,
  #[serde(default, deserialize_with = "duration_serde::deserialize_option")]
  timeout: Option<Duration>,
}

impl RawRuleDefinition {
  fn into_definition(self, name: String) -> RuleDefinition {
    RuleDefinition {
      name,
      operation: self.operation,
      options: Arc::new(self.options),
      conditions: self
        .conditions
        .into_iter()
        .map(|raw| ConditionRef::parse(&raw.name, raw.options))
        .collect(),
      timeout: self.timeout,
    }
  }
}

/// Rule definitions keyed by rule name.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
  rules: HashMap<String, Arc<RuleDefinition>>,
}

impl RuleTable {
  pub fn from_json_str(document: &str) -> LoadResult<Self> {
    let raw: HashMap<String, RawRuleDefinition> =
      serde_json::from_str(document).map_err(|source| LoadError::MalformedSource {
        document: SourceKind::RuleTable,
        source,
      })?;
    let rules = raw
      .into_iter()
      .map(|(name, raw_def)| (name.clone(), Arc::new(raw_def.into_definition(name))))
      .collect();
    Ok(Self { rules })
  }

  /// Adds (or replaces) a definition, keyed by its name.
  pub fn insert(&mut self, definition: RuleDefinition) {
    self.rules.insert(definition.name.clone(), Arc::new(definition));
  }

  pub fn get(&self, name: &str) -> Option<&Arc<RuleDefinition>> {
    self.rules.get(name)
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}

/// The ordered list of rule names to execute. Order is significant and
/// duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RuleSequence(Vec<String>);

impl RuleSequence {
  pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
    Self(names.into_iter().map(Into::into).collect())
  }

  pub fn from_json_str(document: &str) -> LoadResult<Self> {
    serde_json::from_str(document).map_err(|source| LoadError::MalformedSource {
      document: SourceKind::Sequence,
      source,
    })
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}
