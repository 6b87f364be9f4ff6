//! Environment variable interpolation for config files.
//!
//! Supported syntax:
//! - `$VAR` or `${VAR}`: value of VAR, error if unset
//! - `${VAR:-default}`: default if VAR is unset or empty
//! - `${VAR-default}`: default only if VAR is unset
//! - `$$`: a literal `$`

use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$
        |
        \$\{
            (?P<braced>[A-Za-z_][A-Za-z0-9_]*)
            (?:
                (?P<op>:?-)
                (?P<default>[^}]*)
            )?
        \}
        |
        \$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)
        ",
    )
    .expect("Invalid regex pattern")
});

/// Result of environment variable interpolation.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text.
    pub text: String,
    /// Every problem found, so all missing variables are reported at once.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    /// Returns true if there were no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Interpolate environment variables in the given text.
pub fn interpolate(input: &str) -> InterpolationResult {
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN
        .replace_all(input, |caps: &Captures| match resolve(caps) {
            Ok(value) => value,
            Err(message) => {
                errors.push(message);
                caps[0].to_string()
            }
        })
        .into_owned();

    InterpolationResult { text, errors }
}

/// Resolve a single match to its replacement text.
fn resolve(caps: &Captures) -> Result<String, String> {
    if &caps[0] == "$$" {
        return Ok("$".to_string());
    }

    let name = caps
        .name("braced")
        .or_else(|| caps.name("bare"))
        .map(|m| m.as_str())
        .unwrap_or_default();
    let op = caps.name("op").map(|m| m.as_str());
    let default = caps.name("default").map(|m| m.as_str());

    match (env::var(name), default) {
        (Ok(value), _) if value.contains('\n') || value.contains('\r') => Err(format!(
            "environment variable '{name}' contains newlines, which is not allowed"
        )),
        (Ok(value), Some(default)) if value.is_empty() && op == Some(":-") => {
            Ok(default.to_string())
        }
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_string()),
        (Err(_), None) => Err(format!("environment variable '{name}' is not set")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let originals: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();

        // SAFETY: every test uses its own variable names and restores them afterwards
        for (key, value) in vars {
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        let result = f();

        // SAFETY: restoring original environment state
        for (key, original) in originals {
            match original {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        result
    }

    #[test]
    fn test_bare_and_braced_substitution() {
        with_env_vars(&[("SPARKIFY_TEST_BUCKET", Some("songs"))], || {
            let result = interpolate("a: $SPARKIFY_TEST_BUCKET, b: ${SPARKIFY_TEST_BUCKET}");
            assert!(result.is_ok());
            assert_eq!(result.text, "a: songs, b: songs");
        });
    }

    #[test]
    fn test_all_missing_variables_reported() {
        with_env_vars(
            &[("SPARKIFY_TEST_MISS1", None), ("SPARKIFY_TEST_MISS2", None)],
            || {
                let result = interpolate("a: $SPARKIFY_TEST_MISS1, b: ${SPARKIFY_TEST_MISS2}");
                assert_eq!(result.errors.len(), 2);
                assert!(result.errors[0].contains("SPARKIFY_TEST_MISS1"));
                assert!(result.errors[1].contains("not set"));
            },
        );
    }

    #[test]
    fn test_default_forms() {
        with_env_vars(
            &[
                ("SPARKIFY_TEST_UNSET", None),
                ("SPARKIFY_TEST_EMPTY", Some("")),
                ("SPARKIFY_TEST_SET", Some("actual")),
            ],
            || {
                assert_eq!(interpolate("${SPARKIFY_TEST_UNSET:-d}").text, "d");
                assert_eq!(interpolate("${SPARKIFY_TEST_UNSET-d}").text, "d");
                assert_eq!(interpolate("${SPARKIFY_TEST_EMPTY:-d}").text, "d");
                assert_eq!(interpolate("${SPARKIFY_TEST_EMPTY-d}").text, "");
                assert_eq!(interpolate("${SPARKIFY_TEST_SET:-d}").text, "actual");
            },
        );
    }

    #[test]
    fn test_escape_sequence() {
        let result = interpolate("price: $$100");
        assert!(result.is_ok());
        assert_eq!(result.text, "price: $100");
    }

    #[test]
    fn test_newline_injection_blocked() {
        with_env_vars(&[("SPARKIFY_TEST_INJECT", Some("a\nb"))], || {
            let result = interpolate("value: $SPARKIFY_TEST_INJECT");
            assert!(!result.is_ok());
            assert!(result.errors[0].contains("newlines"));
        });
    }

    #[test]
    fn test_yaml_config_example() {
        with_env_vars(
            &[
                ("SPARKIFY_TEST_IN_BUCKET", Some("udacity-dend")),
                ("SPARKIFY_TEST_REGION", None),
            ],
            || {
                let yaml = r#"
input:
  root: "s3a://${SPARKIFY_TEST_IN_BUCKET}/"
  storage_options:
    aws_region: ${SPARKIFY_TEST_REGION:-us-west-2}
"#;
                let result = interpolate(yaml);
                assert!(result.is_ok());
                assert!(result.text.contains("s3a://udacity-dend/"));
                assert!(result.text.contains("aws_region: us-west-2"));
            },
        );
    }
}
