//! Execution Plan Analyzer
//!
//! Annotates parsed execution plans with severity-classified warnings for known
//! performance anti-patterns: serial execution, eager spools, scalar UDF overhead,
//! cardinality misestimates, parallel skew, memory grant waste and residual predicates.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      analyze_plan()                        │
//! │                            │                               │
//! │          ┌─────────────────┼─────────────────┐             │
//! │          ▼                 ▼                 ▼             │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
//! │  │   Document   │  │   Analyzer   │  │    Report    │      │
//! │  │  load/write  │  │  RuleEngine  │  │   Summary    │      │
//! │  │    (JSON)    │  │  S001-S002   │  │   Text       │      │
//! │  │              │  │  N001-N009   │  │              │      │
//! │  └──────────────┘  └──────────────┘  └──────────────┘      │
//! │                            │                               │
//! │                            ▼                               │
//! │                  ParsedPlan (models)                        │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use plan_advisor::services::plan_analyzer::{analyze_plan, document};
//!
//! let mut plan = document::load_plan("plan.json")?;
//! analyze_plan(&mut plan);
//!
//! for statement in plan.statements() {
//!     for warning in &statement.plan_warnings {
//!         println!("[{}] {}", warning.severity, warning.message);
//!     }
//! }
//! ```

pub mod analyzer;
pub mod document;
pub mod error;
pub mod models;
pub mod report;


pub use analyzer::{PlanAnnotations, RuleEngine, RuleEngineConfig};
pub use error::{PlanDocumentError, PlanDocumentResult};
pub use models::*;
pub use report::AnalysisSummary;

/// Analyze a plan with the default rule configuration, annotating it in place
///
/// Intended to run once per tree: a second call appends every rule warning again.
pub fn analyze_plan(plan: &mut ParsedPlan) {
    RuleEngine::new().analyze(plan);
}

/// Analyze a plan with a custom rule configuration
pub fn analyze_plan_with_config(plan: &mut ParsedPlan, config: &RuleEngineConfig) {
    RuleEngine::with_config(config.clone()).analyze(plan);
}
