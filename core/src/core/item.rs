// ruleflow/src/core/item.rs

//! Defines the capability the engine needs from the objects it processes.

use std::sync::Arc;

/// A unit of work flowing through a pipeline.
///
/// The engine never inspects an item beyond its display identifier, which
/// appears in every log record. Items are handed unmodified to each action
/// and condition.
pub trait Item: Send + Sync + 'static {
  fn display_name(&self) -> &str;
}

impl Item for String {
  fn display_name(&self) -> &str {
    self
  }
}

impl Item for &'static str {
  fn display_name(&self) -> &str {
    self
  }
}

impl<T: Item + ?Sized> Item for Box<T> {
  fn display_name(&self) -> &str {
    (**self).display_name()
  }
}

impl<T: Item + ?Sized> Item for Arc<T> {
  fn display_name(&self) -> &str {
    (**self).display_name()
  }
}
