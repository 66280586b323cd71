//! Secret reference resolver for the feed password.
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and takes the first line
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is the password itself

/// Resolves a value that may contain a secret reference prefix.
pub fn resolve(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix("pass::") {
        resolve_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        resolve_env(var)
    } else {
        Ok(value.to_string())
    }
}

/// Returns true if `value` is a reference rather than a literal.
pub fn is_reference(value: &str) -> bool {
    value.starts_with("pass::") || value.starts_with("env::")
}

fn resolve_pass(path: &str) -> Result<String, String> {
    let output = std::process::Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            stderr.trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}

fn resolve_env(var: &str) -> Result<String, String> {
    std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_passthrough() {
        assert_eq!(resolve("hunter2").unwrap(), "hunter2");
        assert_eq!(resolve("").unwrap(), "");
        assert!(!is_reference("hunter2"));
    }

    #[test]
    fn env_reference() {
        unsafe {
            std::env::set_var("_KALSYNC_TEST_FEED_PW", "from-env");
        }
        assert!(is_reference("env::_KALSYNC_TEST_FEED_PW"));
        assert_eq!(resolve("env::_KALSYNC_TEST_FEED_PW").unwrap(), "from-env");
        unsafe {
            std::env::remove_var("_KALSYNC_TEST_FEED_PW");
        }
    }

    #[test]
    fn missing_env_reference_errors() {
        let err = resolve("env::_KALSYNC_SURELY_UNSET_98765").unwrap_err();
        assert!(err.contains("not set"));
    }

    #[test]
    fn failing_pass_reference_errors() {
        assert!(resolve("pass::kalsync/does/not/exist/98765").is_err());
    }
}
