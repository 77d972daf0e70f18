//! Plan document I/O
//!
//! Reads and writes the plan model as JSON. The document is the serialized model, as
//! written by the upstream showplan parser, not a raw showplan.

use super::error::{PlanDocumentError, PlanDocumentResult};
use super::models::ParsedPlan;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Load a plan document from disk
pub fn load_plan(path: impl AsRef<Path>) -> PlanDocumentResult<ParsedPlan> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|source| PlanDocumentError::Io { path: path.to_path_buf(), source })?;
    let plan = parse_plan(&content)
        .map_err(|source| PlanDocumentError::Json { path: path.to_path_buf(), source })?;

    tracing::debug!(
        "Loaded plan document {} ({} batches, {} statements)",
        path.display(),
        plan.batches.len(),
        plan.statements().count()
    );
    Ok(plan)
}

/// Parse a plan document with no nesting limit
///
/// Every operator level nests an object and a `children` array, so the default
/// serde_json depth limit would reject plans deeper than about 60 operators. The
/// stack grows on the heap as deserialization descends.
fn parse_plan(content: &str) -> Result<ParsedPlan, serde_json::Error> {
    let mut deserializer = serde_json::Deserializer::from_str(content);
    deserializer.disable_recursion_limit();
    let plan = ParsedPlan::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(plan)
}

/// Serialize a plan as pretty-printed JSON
pub fn plan_to_json(plan: &ParsedPlan) -> PlanDocumentResult<String> {
    Ok(serde_json::to_string_pretty(plan)?)
}

/// Write a plan document to disk
pub fn write_plan(path: impl AsRef<Path>, plan: &ParsedPlan) -> PlanDocumentResult<()> {
    let path = path.as_ref();
    let json = plan_to_json(plan)?;
    fs::write(path, json)
        .map_err(|source| PlanDocumentError::Io { path: path.to_path_buf(), source })
}
