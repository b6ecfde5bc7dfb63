// ruleflow/examples/archive_batch.rs

use anyhow::Context;
use ruleflow::{ActionRegistry, ConditionRegistry, Engine, EngineConfig, ExitPipeline, Item, Pipeline};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// 1. Define the item type. Only a display name is required by the engine.
#[derive(Clone, Debug)]
struct DailyFile {
  filename: String,
}

impl DailyFile {
  fn new(filename: &str) -> Self {
    Self {
      filename: filename.to_string(),
    }
  }

  /// NET.STA.LOC.CHA.Q.YEAR.DAY
  fn channel(&self) -> &str {
    self.filename.split('.').nth(3).unwrap_or_default()
  }
}

impl Item for DailyFile {
  fn display_name(&self) -> &str {
    &self.filename
  }
}

// 2. The rule table and the sequence would normally live in two JSON files.
const RULES: &str = r#"{
  "announce": {
    "operationName": "printWithMessage",
    "options": { "message": "entering archive pipeline" }
  },
  "checksum": {
    "operationName": "checksumRule",
    "conditions": [ { "conditionName": "!isPressureChannel", "options": { "prefixes": ["BD", "HD"] } } ],
    "timeout": "500ms"
  },
  "quarantine": {
    "operationName": "quarantineRawFileRule",
    "options": { "quarantine_path": "/data/quarantine", "dry_run": true },
    "conditions": [ { "conditionName": "isPressureChannel", "options": { "prefixes": ["BD", "HD"] } } ]
  }
}"#;

const SEQUENCE: &str = r#"["announce", "checksum", "quarantine"]"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Archive Batch Example ---");

  // 3. Register the operations the rule table may reference.
  let actions = ActionRegistry::<DailyFile>::new();
  actions.register("printWithMessage", |options: Arc<Value>, item: Arc<DailyFile>| async move {
    let message = options["message"].as_str().context("option 'message' must be a string")?;
    info!("{} {}", item.filename, message);
    Ok::<(), anyhow::Error>(())
  });
  actions.register("checksumRule", |_options, item: Arc<DailyFile>| async move {
    // Stand-in for real I/O.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let checksum = item.filename.bytes().fold(0u32, |acc, b| acc.rotate_left(5) ^ b as u32);
    info!("{} checksum {:08x}", item.filename, checksum);
    Ok::<(), anyhow::Error>(())
  });
  actions.register("quarantineRawFileRule", |options: Arc<Value>, item: Arc<DailyFile>| async move {
    let destination = options["quarantine_path"].as_str().context("option 'quarantine_path' is required")?;
    if options["dry_run"].as_bool().unwrap_or(false) {
      info!("Would move {} to {}/", item.filename, destination);
    }
    Err::<(), anyhow::Error>(ExitPipeline::new(false, "File quarantined").into())
  });

  let conditions = ConditionRegistry::<DailyFile>::new();
  conditions.register("isPressureChannel", |options, item| {
    let prefixes = options["prefixes"].as_array().context("option 'prefixes' must be a list")?;
    Ok(prefixes
      .iter()
      .filter_map(Value::as_str)
      .any(|prefix| item.channel().starts_with(prefix)))
  });

  // 4. Load and validate the pipeline.
  let pipeline = Pipeline::from_documents(RULES, SEQUENCE, &actions, &conditions)?;
  info!("Loaded rules: {:?}", pipeline.rule_names().collect::<Vec<_>>());

  // 5. Run a batch. Per-rule failures are logged; they never abort the batch.
  let engine = Engine::new(EngineConfig::from_env());
  let files = vec![
    DailyFile::new("NL.HGN.02.BHZ.D.2019.022"),
    DailyFile::new("NL.HGN.02.BDF.D.2019.022"),
  ];
  engine.run(&pipeline, files).await;

  info!("Batch finished.");
  Ok(())
}
