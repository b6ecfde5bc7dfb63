pub mod item;
pub mod outcome;

// Re-export key types for easier access from other ruleflow modules (and lib.rs)
pub use item::Item;
pub use outcome::RuleOutcome;
