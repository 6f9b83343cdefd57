//! `${VAR}` expansion for configuration strings.

use crate::ConfigError;

/// Expand environment variable references in a configuration value.
///
/// `${VAR}` is replaced by the value of `VAR` and fails when it is unset.
/// `${VAR:-default}` falls back to `default`. Bare `$VAR` is left alone so
/// that values such as docsify theme URLs pass through untouched.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var)
            .map(Some)
            .map_err(|_| UnsetVar(var.to_owned()))
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

/// Name of a variable that has no value and no default.
struct UnsetVar(String);
