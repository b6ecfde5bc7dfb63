// src/lib.rs

//! Ruleflow: a rule-sequencing engine for batch processing of archived data objects.
//!
//! Each item of a batch passes through an ordered, externally configured
//! sequence of rules. A rule pairs one named action with zero or more named
//! conditions, each carrying its own options, and an optional deadline.
//!  - Actions and conditions are registered by name in two registries.
//!  - A pipeline is loaded from a rule table and a rule sequence (JSON) and
//!    validated once against the registries.
//!  - Conditions are evaluated in order and short-circuit; a reference written
//!    with a leading `!` inverts its condition.
//!  - Actions run under a per-rule deadline (rule `timeout` or the engine default).
//!  - A failing rule or item never stops the batch: every outcome is classified
//!    (succeeded, condition not met, timed out, errored) and logged.

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

// --- Re-exports for the Public API ---

pub use crate::config::EngineConfig;
pub use crate::core::item::Item;
pub use crate::core::outcome::RuleOutcome;

pub use crate::pipeline::binder::{BoundRule, Gate};
pub use crate::pipeline::definition::{ConditionRef, RuleDefinition, RuleSequence, RuleTable};
pub use crate::pipeline::execution::Engine;
pub use crate::pipeline::loader::{Pipeline, PipelineRule};

pub use crate::registry::{Action, ActionRegistry, Condition, ConditionRegistry, Registry};

pub use crate::error::{ExitPipeline, LoadError, LoadResult, OperationRole, SourceKind};

/*
    Core Workflow:
    1. Implement `Item` for the objects to process (only a display name is required).
    2. Create an `ActionRegistry<MyItem>` and a `ConditionRegistry<MyItem>` and register
       operations by name:
       - actions: `Fn(Arc<Value>, Arc<MyItem>) -> impl Future<Output = anyhow::Result<()>>`
       - conditions: `Fn(&Value, &MyItem) -> anyhow::Result<bool>`
    3. Load a `Pipeline<MyItem>` from a rule table and a rule sequence
       (`Pipeline::load` for files, `Pipeline::from_documents` for strings).
    4. Build an `Engine` from an `EngineConfig` (default rule timeout).
    5. Inside a tokio runtime, call `engine.run(&pipeline, items).await`.
*/
