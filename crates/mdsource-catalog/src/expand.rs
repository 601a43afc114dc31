//! Environment variable expansion for catalog strings.

use std::env::VarError;

use crate::CatalogError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the catalog field for error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, CatalogError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| {
            let reason = match e.cause {
                VarError::NotPresent => "not set",
                VarError::NotUnicode(_) => "not valid unicode",
            };
            CatalogError::EnvVar {
                field: field.to_owned(),
                message: format!("${{{}}} {reason}", e.var_name),
            }
        })
}
