// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use anyhow::{bail, ensure};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use ruleflow::{ActionRegistry, ConditionRegistry, ExitPipeline, Item};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer};

// --- Common Item ---
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveFile {
  pub filename: String,
}

impl ArchiveFile {
  pub fn new(filename: &str) -> Self {
    Self {
      filename: filename.to_string(),
    }
  }
}

impl Item for ArchiveFile {
  fn display_name(&self) -> &str {
    &self.filename
  }
}

pub const MOCK_FILE: &str = "NL.HGN.02.BHZ.D.1970.001";

pub fn mock_file() -> ArchiveFile {
  ArchiveFile::new(MOCK_FILE)
}

// --- Common Rule Table ---
pub const RULES_JSON: &str = r#"{
  "passRule": { "operationName": "passRule", "options": {}, "conditions": [] },
  "exceptionRule": { "operationName": "exceptionRule", "options": {}, "conditions": [] },
  "timeoutRule": { "operationName": "timeoutRule", "options": {}, "conditions": [], "timeout": 1 },
  "optionRule": { "operationName": "optionRule", "options": { "message": "hello", "retries": 3 }, "conditions": [] },
  "exitRule": { "operationName": "exitRule", "options": {}, "conditions": [] },
  "passRuleTrue": {
    "operationName": "passRule",
    "options": {},
    "conditions": [ { "conditionName": "trueCondition", "options": {} } ]
  },
  "passRuleFalse": {
    "operationName": "passRule",
    "options": {},
    "conditions": [ { "conditionName": "falseCondition", "options": {} } ]
  },
  "passRuleConditionException": {
    "operationName": "passRule",
    "options": {},
    "conditions": [ { "conditionName": "exceptionCondition", "options": {} } ]
  },
  "passRuleConditionOptions": {
    "operationName": "passRule",
    "options": {},
    "conditions": [ { "conditionName": "optionCondition", "options": { "threshold": 5 } } ]
  },
  "passRuleShortCircuit": {
    "operationName": "passRule",
    "options": {},
    "conditions": [
      { "conditionName": "falseCondition", "options": {} },
      { "conditionName": "countingCondition", "options": {} }
    ]
  }
}"#;

// --- Execution tracking ---
/// `"<rule operation>:<item>"` for every action invocation that ran to its end.
pub static EXECUTIONS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));
pub static COUNTING_CONDITION_CALLS: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  EXECUTIONS.lock().clear();
  COUNTING_CONDITION_CALLS.store(0, Ordering::SeqCst);
}

pub fn executions() -> Vec<String> {
  EXECUTIONS.lock().clone()
}

fn record_execution(operation: &str, item: &ArchiveFile) {
  EXECUTIONS.lock().push(format!("{}:{}", operation, item.filename));
}

// --- Common Registries ---
pub fn test_actions() -> ActionRegistry<ArchiveFile> {
  let actions = ActionRegistry::<ArchiveFile>::new();

  actions.register("passRule", |_options, item: Arc<ArchiveFile>| async move {
    record_execution("passRule", &item);
    Ok::<(), anyhow::Error>(())
  });

  actions.register("exceptionRule", |_options, _item| async move {
    Err::<(), _>(anyhow::anyhow!("Oops!"))
  });

  actions.register("timeoutRule", |_options, item: Arc<ArchiveFile>| async move {
    tokio::time::sleep(Duration::from_secs(5)).await;
    record_execution("timeoutRule", &item);
    Ok::<(), anyhow::Error>(())
  });

  actions.register("optionRule", |options: Arc<Value>, item: Arc<ArchiveFile>| async move {
    ensure!(options["message"] == "hello", "option 'message' was not passed");
    ensure!(options["retries"] == 3, "option 'retries' was not passed");
    record_execution("optionRule", &item);
    Ok::<(), anyhow::Error>(())
  });

  actions.register("exitRule", |_options, _item| async move {
    Err::<(), _>(anyhow::Error::new(ExitPipeline::new(true, "Upload failed")))
  });

  actions
}

pub fn test_conditions() -> ConditionRegistry<ArchiveFile> {
  let conditions = ConditionRegistry::<ArchiveFile>::new();
  conditions.register("trueCondition", |_options, _item| Ok(true));
  conditions.register("falseCondition", |_options, _item| Ok(false));
  conditions.register("exceptionCondition", |_options, _item| bail!("Oops!"));
  conditions.register("optionCondition", |options, _item| {
    ensure!(options["threshold"] == 5, "option 'threshold' was not passed");
    Ok(true)
  });
  conditions.register("countingCondition", |_options, _item| {
    COUNTING_CONDITION_CALLS.fetch_add(1, Ordering::SeqCst);
    Ok(true)
  });
  conditions
}

// --- Log capture ---
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
  pub level: Level,
  pub message: String,
  pub fields: BTreeMap<String, String>,
}

impl LogRecord {
  /// `"LEVEL:message"`, convenient for whole-log assertions.
  pub fn line(&self) -> String {
    format!("{}:{}", self.level, self.message)
  }

  pub fn field(&self, name: &str) -> Option<&str> {
    self.fields.get(name).map(String::as_str)
  }
}

#[derive(Default)]
struct RecordVisitor {
  message: String,
  fields: BTreeMap<String, String>,
}

impl Visit for RecordVisitor {
  fn record_str(&mut self, field: &Field, value: &str) {
    if field.name() == "message" {
      self.message = value.to_string();
    } else {
      self.fields.insert(field.name().to_string(), value.to_string());
    }
  }

  fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
    if field.name() == "message" {
      self.message = format!("{:?}", value);
    } else {
      self.fields.insert(field.name().to_string(), format!("{:?}", value));
    }
  }
}

/// Collects every event emitted by the `ruleflow` crate.
#[derive(Clone, Default)]
pub struct LogCapture {
  records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogCapture {
  /// Records at `min_level` or more severe, in emission order.
  pub fn records(&self, min_level: Level) -> Vec<LogRecord> {
    self
      .records
      .lock()
      .iter()
      .filter(|record| record.level <= min_level)
      .cloned()
      .collect()
  }

  pub fn lines(&self, min_level: Level) -> Vec<String> {
    self.records(min_level).iter().map(LogRecord::line).collect()
  }

  /// Records carrying a `rule` field, i.e. terminal rule outcomes.
  pub fn outcomes(&self) -> Vec<LogRecord> {
    self
      .records(Level::INFO)
      .into_iter()
      .filter(|record| record.field("rule").is_some())
      .collect()
  }
}

impl<S: Subscriber> Layer<S> for LogCapture {
  fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
    if !event.metadata().target().starts_with("ruleflow") {
      return;
    }
    let mut visitor = RecordVisitor::default();
    event.record(&mut visitor);
    self.records.lock().push(LogRecord {
      level: *event.metadata().level(),
      message: visitor.message,
      fields: visitor.fields,
    });
  }
}

/// Installs a capturing subscriber for the current thread. Keep the guard
/// alive for the duration of the test; `RUST_LOG` additionally echoes
/// events to the test output.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
  let capture = LogCapture::default();
  let subscriber = tracing_subscriber::registry().with(capture.clone()).with(
    tracing_subscriber::fmt::layer()
      .with_test_writer()
      .with_filter(EnvFilter::from_default_env()),
  );
  let guard = tracing::subscriber::set_default(subscriber);
  (capture, guard)
}
