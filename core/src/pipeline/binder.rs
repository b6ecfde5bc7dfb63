// ruleflow/src/pipeline/binder.rs

//! Turns a loaded rule into a `BoundRule<I>`: closures over the resolved
//! implementations and the definition's options, ready to be invoked for one item.

use crate::core::item::Item;
use crate::pipeline::loader::PipelineRule;
use anyhow::{anyhow, Context as AnyhowContext};
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// A boxed, `'static` action invocation.
pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// The action of a bound rule. Calling it with an item invokes the registered
/// action with the rule's options.
pub type BoundAction<I> = Box<dyn Fn(Arc<I>) -> ActionFuture + Send + Sync>;

/// A gating predicate, already negated when the reference asked for it.
pub type BoundPredicate<I> = Box<dyn Fn(&I) -> anyhow::Result<bool> + Send + Sync>;

pub struct BoundCondition<I: Item> {
  /// The reference as written, negation marker included.
  pub reference: String,
  predicate: BoundPredicate<I>,
}

impl<I: Item> BoundCondition<I> {
  pub fn evaluate(&self, item: &I) -> anyhow::Result<bool> {
    (self.predicate)(item)
  }
}

/// Result of evaluating a bound rule's conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
  /// Every condition passed (or there were none).
  Open,
  /// The named condition reference evaluated to false.
  Closed { condition: String },
}

/// A rule ready to run for one item. Built fresh for every (item, rule) pair
/// and discarded afterwards.
pub struct BoundRule<I: Item> {
  action: BoundAction<I>,
  conditions: Vec<BoundCondition<I>>,
  timeout: Duration,
}

impl<I: Item> BoundRule<I> {
  /// Evaluates conditions in order, stopping at the first that does not pass.
  /// An error or panic from a condition is returned with the reference as context.
  pub fn evaluate_conditions(&self, item: &I) -> anyhow::Result<Gate> {
    for condition in &self.conditions {
      let passed = condition
        .evaluate(item)
        .with_context(|| format!("condition '{}'", condition.reference))?;
      if !passed {
        return Ok(Gate::Closed {
          condition: condition.reference.clone(),
        });
      }
    }
    Ok(Gate::Open)
  }

  /// Starts the action for `item`. The returned future is `'static` so it can
  /// be moved into its own task.
  pub fn invoke(&self, item: Arc<I>) -> ActionFuture {
    (self.action)(item)
  }

  pub fn conditions(&self) -> &[BoundCondition<I>] {
    &self.conditions
  }

  /// The effective deadline for the action.
  pub fn timeout(&self) -> Duration {
    self.timeout
  }
}

impl<I: Item> PipelineRule<I> {
  /// Binds this rule's options to its action and conditions.
  ///
  /// The rule's own timeout wins when configured, including an explicit zero;
  /// otherwise `default_timeout` applies.
  pub fn bind(&self, default_timeout: Duration) -> BoundRule<I> {
    let action_impl = self.action.clone();
    let options = self.definition.options.clone();
    let action: BoundAction<I> = Box::new(move |item: Arc<I>| -> ActionFuture {
      let action_impl = action_impl.clone();
      let options = options.clone();
      Box::pin(async move { action_impl.apply(options, item).await })
    });

    let conditions = self
      .definition
      .conditions
      .iter()
      .zip(&self.conditions)
      .map(|(condition_ref, condition_impl)| {
        let condition_impl = condition_impl.clone();
        let options = condition_ref.options.clone();
        let negated = condition_ref.negated;
        let predicate: BoundPredicate<I> = Box::new(move |item: &I| {
          let passed = panic::catch_unwind(AssertUnwindSafe(|| condition_impl.evaluate(&options, item)))
            .unwrap_or_else(|payload| Err(anyhow!("panicked: {}", payload_message(&*payload))))?;
          Ok(passed != negated)
        });
        BoundCondition {
          reference: condition_ref.to_string(),
          predicate,
        }
      })
      .collect();

    BoundRule {
      action,
      conditions,
      timeout: self.definition.timeout.unwrap_or(default_timeout),
    }
  }
}

/// Text of a panic payload, for `panic!` with a literal or a formatted message.
pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
