// ruleflow/src/error.rs
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The two configuration documents a pipeline is loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
  RuleTable,
  Sequence,
}

impl fmt::Display for SourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SourceKind::RuleTable => f.write_str("rule table"),
      SourceKind::Sequence => f.write_str("rule sequence"),
    }
  }
}

/// Which registry an operation name is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationRole {
  Action,
  Condition,
}

impl fmt::Display for OperationRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OperationRole::Action => f.write_str("action"),
      OperationRole::Condition => f.write_str("condition"),
    }
  }
}

/// Load-time configuration errors. Any of these aborts pipeline construction;
/// no partially validated pipeline is ever returned.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("The {document} '{}' could not be read. Source: {source}", .path.display())]
  SourceUnavailable {
    document: SourceKind,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("The {document} is malformed: {source}")]
  MalformedSource {
    document: SourceKind,
    #[source]
    source: serde_json::Error,
  },

  #[error("The rule '{rule_name}' could not be found in the configured rule table.")]
  UnknownRuleReference { rule_name: String },

  #[error("No {role} named '{operation}' is registered (referenced by rule '{rule_name}').")]
  UnregisteredOperation {
    rule_name: String,
    role: OperationRole,
    operation: String,
  },

  #[error("The {role} '{operation}' referenced by rule '{rule_name}' is not invocable.")]
  NotInvocable {
    rule_name: String,
    role: OperationRole,
    operation: String,
  },
}

pub type LoadResult<T, E = LoadError> = std::result::Result<T, E>;

/// Raised by an action to signal that it is done with the current item.
///
/// `abort_run` additionally asks for the whole batch to stop. The engine
/// currently records both fields on the error log record and otherwise treats
/// the signal like any other action failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ExitPipeline {
  pub abort_run: bool,
  pub message: String,
}

impl ExitPipeline {
  pub fn new(abort_run: bool, message: impl Into<String>) -> Self {
    Self {
      abort_run,
      message: message.into(),
    }
  }
}
