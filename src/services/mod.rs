pub mod plan_analyzer;

pub use plan_analyzer::{RuleEngine, RuleEngineConfig};
