//! Plan Advisor Library
//!
//! Diagnostics for parsed query execution plans.

pub mod config;
pub mod services;

// Re-export commonly used types
pub use config::Config;
pub use services::plan_analyzer::{
    AnalysisSummary, ParsedPlan, RuleEngine, RuleEngineConfig, analyze_plan,
    analyze_plan_with_config,
};
