// ruleflow/src/core/outcome.rs

//! Terminal states of a single (item, rule) pair.

use std::fmt;

/// How one rule ended for one item.
///
/// Every variant is terminal: the engine moves on to the next rule (or item)
/// whatever the outcome, and never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
  /// All conditions passed and the action completed before its deadline.
  Succeeded,
  /// A condition evaluated to false; the action was not invoked.
  ConditionNotMet,
  /// The action did not complete before its deadline and was abandoned.
  TimedOut,
  /// The action, or the evaluation of a condition, returned an error or panicked.
  Errored,
}

impl fmt::Display for RuleOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      RuleOutcome::Succeeded => "succeeded",
      RuleOutcome::ConditionNotMet => "condition_not_met",
      RuleOutcome::TimedOut => "timed_out",
      RuleOutcome::Errored => "errored",
    };
    f.write_str(label)
  }
}
