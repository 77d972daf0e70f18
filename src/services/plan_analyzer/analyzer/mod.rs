//! Plan analyzer module
//!
//! Provides rule-based diagnostics for execution plans.

pub mod annotations;
pub mod rule_engine;
pub mod rules;
pub mod thresholds;
pub mod traversal;

pub use annotations::{NodeAnnotation, NodeKey, PlanAnnotations, StatementKey};
pub use rule_engine::{RuleEngine, RuleEngineConfig};
pub use thresholds::AnalyzerThresholds;
