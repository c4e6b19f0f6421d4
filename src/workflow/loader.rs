use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{ConductorError, Result};

use super::definition::WorkflowDefinition;

/// Parses a workflow definition from its JSON form.
pub fn definition_from_str(json: &str) -> Result<WorkflowDefinition> {
    serde_json::from_str(json)
        .map(normalize)
        .map_err(|e| ConductorError::InvalidInput(format!("invalid workflow json: {e}")))
}

pub fn definition_from_value(value: Value) -> Result<WorkflowDefinition> {
    serde_json::from_value(value)
        .map(normalize)
        .map_err(|e| ConductorError::InvalidInput(format!("invalid workflow json: {e}")))
}

pub fn definition_from_path(path: impl AsRef<Path>) -> Result<WorkflowDefinition> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|e| {
        ConductorError::InvalidInput(format!("cannot read workflow file `{}`: {e}", path.display()))
    })?;
    definition_from_str(&raw)
}

/// Display names are optional on the wire and fall back to ids.
fn normalize(mut definition: WorkflowDefinition) -> WorkflowDefinition {
    if definition.name.is_empty() {
        definition.name = definition.id.clone();
    }
    for task in &mut definition.tasks {
        if task.name.is_empty() {
            task.name = task.id.clone();
        }
    }
    definition
}
