// ruleflow/src/pipeline/execution.rs

//! Contains the `Engine`, which applies a loaded pipeline to a batch of items.
//!
//! Items are processed strictly one after another and, within an item, rules
//! run strictly in pipeline order. No per-rule failure ever escapes `run`:
//! every (item, rule) pair ends in one of the `RuleOutcome` states, is logged,
//! and processing moves on.

use crate::config::EngineConfig;
use crate::core::item::Item;
use crate::core::outcome::RuleOutcome;
use crate::error::ExitPipeline;
use crate::pipeline::binder::{payload_message, BoundRule, Gate};
use crate::pipeline::loader::{Pipeline, PipelineRule};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{event, info_span, instrument, Instrument, Level};

/// How a deadline-bound action invocation ended.
enum Attempt {
  Completed,
  Failed(anyhow::Error),
  Panicked(JoinError),
  DeadlineElapsed,
}

/// Runs pipelines against batches of items.
#[derive(Debug, Clone)]
pub struct Engine {
  default_timeout: Duration,
}

impl Default for Engine {
  fn default() -> Self {
    Self::new(EngineConfig::default())
  }
}

impl Engine {
  pub fn new(config: EngineConfig) -> Self {
    Self {
      default_timeout: config.default_rule_timeout,
    }
  }

  /// Deadline for rules that do not configure their own timeout.
  pub fn default_timeout(&self) -> Duration {
    self.default_timeout
  }

  /// Applies every rule of `pipeline`, in order, to every item, in order.
  ///
  /// Must be called from within a tokio runtime: each action runs in its own
  /// task so that it can be abandoned when its deadline passes. Outcomes are
  /// only observable through the log and the actions' own side effects.
  #[instrument(name = "Engine::run", skip_all, fields(num_rules = pipeline.len()))]
  pub async fn run<I, Items>(&self, pipeline: &Pipeline<I>, items: Items)
  where
    I: Item,
    Items: IntoIterator<Item = I>,
  {
    let items: Vec<Arc<I>> = items.into_iter().map(Arc::new).collect();
    let total = items.len();
    event!(Level::DEBUG, num_items = total, "Batch starting.");

    for (index, item) in items.iter().enumerate() {
      let item_span = info_span!("item", item = item.display_name(), item_index = index);
      async {
        event!(
          Level::INFO,
          "Processing item {} ({}/{}).",
          item.display_name(),
          index + 1,
          total
        );

        for rule in pipeline.rules() {
          let outcome = self.apply_rule(rule, item).await;
          event!(Level::TRACE, rule = rule.name(), %outcome, "Rule finished.");
        }
      }
      .instrument(item_span)
      .await;
    }

    event!(Level::DEBUG, num_items = total, "Batch completed.");
  }

  /// Runs one rule for one item: bind, gate on conditions, invoke under the
  /// deadline, log the outcome.
  pub(crate) async fn apply_rule<I: Item>(&self, rule: &PipelineRule<I>, item: &Arc<I>) -> RuleOutcome {
    let bound = rule.bind(self.default_timeout);
    let item_name = item.display_name();
    let rule_name = rule.name();
    let operation = rule.definition().operation.as_str();

    match bound.evaluate_conditions(item) {
      Ok(Gate::Open) => {}
      Ok(Gate::Closed { condition }) => {
        event!(
          Level::INFO,
          item = item_name,
          rule = rule_name,
          operation,
          condition = %condition,
          "{}: Not executing rule '{}'. Rule did not pass condition '{}'.",
          item_name,
          rule_name,
          condition
        );
        return RuleOutcome::ConditionNotMet;
      }
      Err(e) => {
        event!(
          Level::ERROR,
          item = item_name,
          rule = rule_name,
          operation,
          "{}: Rule execution '{}' failed: {:#}",
          item_name,
          rule_name,
          e
        );
        return RuleOutcome::Errored;
      }
    }

    match invoke_with_deadline(&bound, item.clone()).await {
      Attempt::Completed => {
        event!(
          Level::INFO,
          item = item_name,
          rule = rule_name,
          operation,
          "{}: Successfully executed rule '{}'.",
          item_name,
          rule_name
        );
        RuleOutcome::Succeeded
      }
      Attempt::DeadlineElapsed => {
        event!(
          Level::WARN,
          item = item_name,
          rule = rule_name,
          operation,
          timeout_ms = saturating_millis(bound.timeout()),
          "{}: Timeout calling rule '{}'.",
          item_name,
          rule_name
        );
        RuleOutcome::TimedOut
      }
      Attempt::Failed(e) => {
        match e.downcast_ref::<ExitPipeline>() {
          Some(exit) => event!(
            Level::ERROR,
            item = item_name,
            rule = rule_name,
            operation,
            exit_requested = true,
            abort_run = exit.abort_run,
            "{}: Rule execution '{}' failed: {:#}",
            item_name,
            rule_name,
            e
          ),
          None => event!(
            Level::ERROR,
            item = item_name,
            rule = rule_name,
            operation,
            "{}: Rule execution '{}' failed: {:#}",
            item_name,
            rule_name,
            e
          ),
        }
        RuleOutcome::Errored
      }
      Attempt::Panicked(join_err) => {
        event!(
          Level::ERROR,
          item = item_name,
          rule = rule_name,
          operation,
          "{}: Rule execution '{}' failed: action panicked: {}",
          item_name,
          rule_name,
          panic_message(join_err)
        );
        RuleOutcome::Errored
      }
    }
  }
}

/// Invokes the bound action in its own task, raced against the rule's
/// deadline. On expiry the task is aborted; the timer and the task handle are
/// both dropped before this returns, so no deadline outlives its invocation.
async fn invoke_with_deadline<I: Item>(bound: &BoundRule<I>, item: Arc<I>) -> Attempt {
  let deadline = bound.timeout();
  if deadline.is_zero() {
    return Attempt::DeadlineElapsed;
  }

  let expiry = tokio::time::Instant::now() + deadline;
  let mut handle = tokio::spawn(bound.invoke(item));
  // An action that blocked its worker past the deadline has already finished
  // when the handle is polled, and the timer may not have fired yet: the
  // completion instant decides.
  tokio::select! {
    biased;
    _ = tokio::time::sleep_until(expiry) => {
      handle.abort();
      Attempt::DeadlineElapsed
    }
    joined = &mut handle => match joined {
      _ if tokio::time::Instant::now() >= expiry => Attempt::DeadlineElapsed,
      Ok(Ok(())) => Attempt::Completed,
      Ok(Err(e)) => Attempt::Failed(e),
      Err(join_err) => Attempt::Panicked(join_err),
    },
  }
}

fn saturating_millis(duration: Duration) -> u64 {
  u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(join_err: JoinError) -> String {
  match join_err.try_into_panic() {
    Ok(payload) => payload_message(&*payload),
    Err(join_err) => join_err.to_string(),
  }
}
