use crate::error::{ConductorError, Result};

pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Checks applied to caller-supplied names at the API boundary, before they
/// become map keys or log fields.
pub struct InputValidator;

impl InputValidator {
    /// Identifiers (workflow ids, task ids, agent ids) must be non-empty,
    /// bounded in length, and limited to alphanumerics plus `_`, `-`, `.`.
    pub fn validate_identifier(field: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(ConductorError::InvalidInput(format!(
                "{field} must not be empty"
            )));
        }
        if value.len() > MAX_IDENTIFIER_LEN {
            return Err(ConductorError::InvalidInput(format!(
                "{field} exceeds {MAX_IDENTIFIER_LEN} characters"
            )));
        }
        if !value
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(ConductorError::InvalidInput(format!(
                "{field} `{value}` contains invalid characters; allowed are letters, digits, `_`, `-` and `.`"
            )));
        }
        Ok(())
    }

    /// Free-form required fields only need to be non-empty.
    pub fn validate_required(field: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConductorError::InvalidInput(format!(
                "{field} must not be empty"
            )));
        }
        Ok(())
    }
}
