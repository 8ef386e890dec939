use thiserror::Error;

/// Errors raised while reading configuration from the process environment.
#[derive(Debug, Error)]
pub enum EnvError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    Missing(String),
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// Empty values are treated as missing so a blank `export TOKEN=` does not
/// masquerade as a credential.
pub fn get_env_var(name: &str) -> Result<String, EnvError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(EnvError::Missing(name.to_string())),
    }
}

/// Reads an optional environment variable; `None` when unset or blank.
pub fn get_env_var_opt(name: &str) -> Option<String> {
    get_env_var(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_is_reported_by_name() {
        let err = get_env_var("SHARED_UTILS_SURELY_UNSET_VAR").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing environment variable: SHARED_UTILS_SURELY_UNSET_VAR"
        );
    }

    #[test]
    fn blank_optional_is_none() {
        assert!(get_env_var_opt("SHARED_UTILS_SURELY_UNSET_VAR").is_none());
    }
}
