// ruleflow/src/pipeline/loader.rs

//! Builds a validated `Pipeline<I>` from a rule table, a rule sequence and
//! the two operation registries.

use crate::core::item::Item;
use crate::error::{LoadError, LoadResult, SourceKind};
use crate::pipeline::definition::{RuleDefinition, RuleSequence, RuleTable};
use crate::registry::{Action, ActionRegistry, Condition, ConditionRegistry};
use std::path::Path;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// One entry of a loaded pipeline: the immutable definition together with the
/// implementations its names resolved to at load time.
pub struct PipelineRule<I: Item> {
  pub(crate) definition: Arc<RuleDefinition>,
  pub(crate) action: Arc<dyn Action<I>>,
  /// Parallel to `definition.conditions`.
  pub(crate) conditions: Vec<Arc<dyn Condition<I>>>,
}

impl<I: Item> PipelineRule<I> {
  pub fn definition(&self) -> &RuleDefinition {
    &self.definition
  }

  pub fn name(&self) -> &str {
    &self.definition.name
  }
}

impl<I: Item> Clone for PipelineRule<I> {
  fn clone(&self) -> Self {
    Self {
      definition: self.definition.clone(),
      action: self.action.clone(),
      conditions: self.conditions.clone(),
    }
  }
}

impl<I: Item> std::fmt::Debug for PipelineRule<I> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PipelineRule")
      .field("definition", &self.definition)
      .finish_non_exhaustive()
  }
}

/// An ordered, fully validated list of rules. Read-only once loaded.
pub struct Pipeline<I: Item> {
  rules: Vec<PipelineRule<I>>,
}

impl<I: Item> Pipeline<I> {
  /// Reads the rule table and the rule sequence from JSON files and validates
  /// every reference against the registries.
  pub fn load(
    rule_table_path: impl AsRef<Path>,
    sequence_path: impl AsRef<Path>,
    actions: &ActionRegistry<I>,
    conditions: &ConditionRegistry<I>,
  ) -> LoadResult<Self> {
    let rule_table = read_source(rule_table_path.as_ref(), SourceKind::RuleTable)?;
    let sequence = read_source(sequence_path.as_ref(), SourceKind::Sequence)?;
    Self::from_documents(&rule_table, &sequence, actions, conditions)
  }

  /// Same as [`Pipeline::load`], from documents already in memory.
  pub fn from_documents(
    rule_table: &str,
    sequence: &str,
    actions: &ActionRegistry<I>,
    conditions: &ConditionRegistry<I>,
  ) -> LoadResult<Self> {
    let table = RuleTable::from_json_str(rule_table)?;
    let sequence = RuleSequence::from_json_str(sequence)?;
    Self::from_parts(&table, &sequence, actions, conditions)
  }

  /// Resolves `sequence` against `table`, then every action and condition
  /// name against the registries. Fails on the first invalid reference.
  #[instrument(name = "Pipeline::from_parts", skip_all, fields(num_rules = sequence.len()), err(Display))]
  pub fn from_parts(
    table: &RuleTable,
    sequence: &RuleSequence,
    actions: &ActionRegistry<I>,
    conditions: &ConditionRegistry<I>,
  ) -> LoadResult<Self> {
    let definitions = sequence
      .iter()
      .map(|rule_name| {
        table.get(rule_name).cloned().ok_or_else(|| LoadError::UnknownRuleReference {
          rule_name: rule_name.to_string(),
        })
      })
      .collect::<LoadResult<Vec<_>>>()?;

    let rules = definitions
      .into_iter()
      .map(|definition| resolve_rule(definition, actions, conditions))
      .collect::<LoadResult<Vec<_>>>()?;

    event!(Level::DEBUG, "Pipeline loaded and validated.");
    Ok(Self { rules })
  }

  pub fn rules(&self) -> &[PipelineRule<I>] {
    &self.rules
  }

  pub fn rule_names(&self) -> impl Iterator<Item = &str> {
    self.rules.iter().map(PipelineRule::name)
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}

fn read_source(path: &Path, document: SourceKind) -> LoadResult<String> {
  std::fs::read_to_string(path).map_err(|source| LoadError::SourceUnavailable {
    document,
    path: path.to_path_buf(),
    source,
  })
}

fn resolve_rule<I: Item>(
  definition: Arc<RuleDefinition>,
  actions: &ActionRegistry<I>,
  conditions: &ConditionRegistry<I>,
) -> LoadResult<PipelineRule<I>> {
  let action = actions.resolve(&definition.name, &definition.operation)?;
  let resolved_conditions = definition
    .conditions
    .iter()
    .map(|condition_ref| conditions.resolve(&definition.name, &condition_ref.name))
    .collect::<LoadResult<Vec<_>>>()?;

  event!(
    Level::DEBUG,
    rule = %definition.name,
    operation = %definition.operation,
    num_conditions = resolved_conditions.len(),
    "Rule resolved."
  );
  Ok(PipelineRule {
    definition,
    action,
    conditions: resolved_conditions,
  })
}
