// ruleflow/src/pipeline/mod.rs

//! Defines rule definitions, pipeline loading and validation, rule binding, and execution.

pub mod binder;
pub mod definition;
pub mod execution;
pub mod loader;

// Re-export the main types
pub use binder::{BoundRule, Gate};
pub use definition::{ConditionRef, RuleDefinition, RuleSequence, RuleTable, NEGATION_MARKER};
pub use execution::Engine;
pub use loader::{Pipeline, PipelineRule};
