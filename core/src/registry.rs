// ruleflow/src/registry.rs

//! Name-keyed registries of the operations a pipeline may reference.
//!
//! Two independent registries exist per run: one for actions and one for
//! conditions. The host populates them before any pipeline is loaded; the
//! loader resolves every referenced name once and keeps the resolved
//! implementations, so later registrations never affect a loaded pipeline.

use crate::core::item::Item;
use crate::error::{LoadError, OperationRole};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

/// The primary operation a rule performs on an item.
///
/// Actions may run for a long time; the engine enforces the rule's deadline
/// by abandoning the invocation. An action is abandoned at its next await
/// point (or keeps running to completion if it blocks), so implementations
/// must stay safe to abandon: idempotent side effects, nothing half-written.
#[async_trait]
pub trait Action<I: Item>: Send + Sync {
  async fn apply(&self, options: Arc<Value>, item: Arc<I>) -> anyhow::Result<()>;
}

/// A boolean precondition gating whether a rule's action runs.
///
/// Conditions are expected to be fast and are not deadline-bound.
pub trait Condition<I: Item>: Send + Sync {
  fn evaluate(&self, options: &Value, item: &I) -> anyhow::Result<bool>;
}

/// Adapts an async closure into an [`Action`].
struct FnAction<F, Fut> {
  f: F,
  _phantom_fut: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<I, F, Fut> Action<I> for FnAction<F, Fut>
where
  I: Item,
  F: Fn(Arc<Value>, Arc<I>) -> Fut + Send + Sync,
  Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
  async fn apply(&self, options: Arc<Value>, item: Arc<I>) -> anyhow::Result<()> {
    (self.f)(options, item).await
  }
}

/// Adapts a closure into a [`Condition`].
struct FnCondition<F>(F);

impl<I, F> Condition<I> for FnCondition<F>
where
  I: Item,
  F: Fn(&Value, &I) -> anyhow::Result<bool> + Send + Sync,
{
  fn evaluate(&self, options: &Value, item: &I) -> anyhow::Result<bool> {
    (self.0)(options, item)
  }
}

enum Entry<T: ?Sized> {
  Published(Arc<T>),
  /// A published name with no implementation behind it.
  Reserved,
}

/// A mapping from operation name to implementation for one role.
pub struct Registry<T: ?Sized> {
  role: OperationRole,
  entries: RwLock<HashMap<String, Entry<T>>>,
}

pub type ActionRegistry<I> = Registry<dyn Action<I>>;
pub type ConditionRegistry<I> = Registry<dyn Condition<I>>;

impl<T: ?Sized> Registry<T> {
  fn with_role(role: OperationRole) -> Self {
    Self {
      role,
      entries: RwLock::new(HashMap::new()),
    }
  }

  pub fn role(&self) -> OperationRole {
    self.role
  }

  fn insert(&self, name: String, entry: Entry<T>) {
    event!(Level::DEBUG, role = %self.role, operation = %name, "Registering operation.");
    if self.entries.write().insert(name.clone(), entry).is_some() {
      event!(Level::DEBUG, role = %self.role, operation = %name, "Replaced a previously registered operation.");
    }
  }

  /// Publishes `name` without an implementation. Pipelines referencing it
  /// fail to load with [`LoadError::NotInvocable`].
  pub fn reserve(&self, name: impl Into<String>) {
    self.insert(name.into(), Entry::Reserved);
  }

  /// True when `name` is published, whether or not it is invocable.
  pub fn contains(&self, name: &str) -> bool {
    self.entries.read().contains_key(name)
  }

  /// Published names, sorted.
  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
    names.sort();
    names
  }

  /// Resolves `operation` for the rule `rule_name`.
  pub(crate) fn resolve(&self, rule_name: &str, operation: &str) -> Result<Arc<T>, LoadError> {
    match self.entries.read().get(operation) {
      Some(Entry::Published(implementation)) => Ok(implementation.clone()),
      Some(Entry::Reserved) => Err(LoadError::NotInvocable {
        rule_name: rule_name.to_string(),
        role: self.role,
        operation: operation.to_string(),
      }),
      None => Err(LoadError::UnregisteredOperation {
        rule_name: rule_name.to_string(),
        role: self.role,
        operation: operation.to_string(),
      }),
    }
  }
}

impl<I: Item> Registry<dyn Action<I>> {
  /// Creates a new, empty action registry.
  pub fn new() -> Self {
    Self::with_role(OperationRole::Action)
  }

  /// Registers an async closure `(options, item) -> anyhow::Result<()>` under `name`.
  pub fn register<F, Fut>(&self, name: impl Into<String>, action_fn: F)
  where
    F: Fn(Arc<Value>, Arc<I>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
  {
    self.register_handler(
      name,
      FnAction {
        f: action_fn,
        _phantom_fut: PhantomData,
      },
    );
  }

  /// Registers a typed [`Action`] implementation under `name`.
  pub fn register_handler(&self, name: impl Into<String>, action: impl Action<I> + 'static) {
    self.insert(name.into(), Entry::Published(Arc::new(action)));
  }
}

impl<I: Item> Default for Registry<dyn Action<I>> {
  fn default() -> Self {
    Self::new()
  }
}

impl<I: Item> Registry<dyn Condition<I>> {
  /// Creates a new, empty condition registry.
  pub fn new() -> Self {
    Self::with_role(OperationRole::Condition)
  }

  /// Registers a closure `(options, item) -> anyhow::Result<bool>` under `name`.
  pub fn register<F>(&self, name: impl Into<String>, condition_fn: F)
  where
    F: Fn(&Value, &I) -> anyhow::Result<bool> + Send + Sync + 'static,
  {
    self.register_handler(name, FnCondition(condition_fn));
  }

  /// Registers a typed [`Condition`] implementation under `name`.
  pub fn register_handler(&self, name: impl Into<String>, condition: impl Condition<I> + 'static) {
    self.insert(name.into(), Entry::Published(Arc::new(condition)));
  }
}

impl<I: Item> Default for Registry<dyn Condition<I>> {
  fn default() -> Self {
    Self::new()
  }
}
