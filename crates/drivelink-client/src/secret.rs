//! Secret references in configuration values.
//!
//! `session_token` and `developer_key` may point outside `config.toml`:
//!
//! - `pass::path/in/store` - first line of `pass show path/in/store`
//! - `env::VAR_NAME` - the value of `$VAR_NAME`
//! - anything else - used as written

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, String> {
    match value.split_once("::") {
        Some(("pass", path)) => from_pass(path),
        Some(("env", var)) => {
            std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
        }
        _ => Ok(value.to_string()),
    }
}

/// Resolves an optional value, treating an empty result as unset.
pub fn resolve_optional(value: Option<&str>) -> Result<Option<String>, String> {
    match value {
        Some(raw) => resolve(raw).map(|v| Some(v).filter(|v| !v.is_empty())),
        None => Ok(None),
    }
}

fn from_pass(path: &str) -> Result<String, String> {
    let output = std::process::Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(resolve("AIzaSyExample").unwrap(), "AIzaSyExample");
        assert_eq!(resolve("").unwrap(), "");
        assert_eq!(resolve("a::b").unwrap(), "a::b");
    }

    #[test]
    fn env_reference() {
        unsafe {
            std::env::set_var("_DRIVELINK_TEST_DEV_KEY", "key-from-env");
        }
        assert_eq!(resolve("env::_DRIVELINK_TEST_DEV_KEY").unwrap(), "key-from-env");
        unsafe {
            std::env::remove_var("_DRIVELINK_TEST_DEV_KEY");
        }
    }

    #[test]
    fn missing_env_var_errors() {
        let err = resolve("env::_DRIVELINK_SURELY_UNSET_98765").unwrap_err();
        assert!(err.contains("not set"));
    }

    #[test]
    fn missing_pass_entry_errors() {
        assert!(resolve("pass::drivelink/does/not/exist/98765").is_err());
    }

    #[test]
    fn optional_empty_is_none() {
        assert_eq!(resolve_optional(None).unwrap(), None);
        assert_eq!(resolve_optional(Some("")).unwrap(), None);
        assert_eq!(
            resolve_optional(Some("tok")).unwrap(),
            Some("tok".to_string())
        );
    }
}
