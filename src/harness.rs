//! Test-harness integration.
//!
//! Container-backed tests are opt-out: setting `CONTAINERS_DISABLE_TESTING`
//! to a truthy value makes every suite that starts with
//! [`skip_if_disabled!`](crate::skip_if_disabled) return early, so the rest
//! of the test run works on machines without a Docker daemon.
//!
//! The backend adapters also read their endpoint and image overrides from
//! the environment; the shared helpers live here.

use std::env;

use thiserror::Error;

/// Environment variable that disables every container-backed test.
pub const DISABLE_TESTING_ENV: &str = "CONTAINERS_DISABLE_TESTING";

/// Whether container-backed testing is disabled for this process.
pub fn disabled() -> bool {
    env::var(DISABLE_TESTING_ENV)
        .map(|value| parse_flag(&value))
        .unwrap_or(false)
}

/// Boolean parsing compatible with the usual truthy spellings
/// (`1`, `t`, `T`, `true`, `TRUE`, `True`).
fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "true" | "TRUE" | "True")
}

/// Returns early from the surrounding test when container-backed testing
/// is disabled via [`DISABLE_TESTING_ENV`].
#[macro_export]
macro_rules! skip_if_disabled {
    () => {
        if $crate::harness::disabled() {
            eprintln!(
                "test skipped because {} is set to true",
                $crate::harness::DISABLE_TESTING_ENV
            );
            return;
        }
    };
}

/// A creator needed an environment variable that is not set.
#[derive(Debug, Error)]
#[error("environment variable {0} is not set")]
pub struct MissingEnv(pub &'static str);

/// Reads `key` from the environment, treating an empty value as unset.
pub(crate) fn env_value(key: &'static str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

/// Splits a container image reference into name and tag, defaulting the
/// tag to `latest`.
pub(crate) fn split_image(image: &str) -> (String, String) {
    match image.split_once(':') {
        Some((name, tag)) => (name.to_owned(), tag.to_owned()),
        None => (image.to_owned(), "latest".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_accepts_truthy_spellings() {
        for value in ["1", "t", "T", "true", "TRUE", "True"] {
            assert!(parse_flag(value), "{value} should disable testing");
        }
    }

    #[test]
    fn test_parse_flag_rejects_everything_else() {
        for value in ["0", "f", "false", "", "yes", "on", "2"] {
            assert!(!parse_flag(value), "{value} should not disable testing");
        }
    }

    #[test]
    fn test_split_image_with_tag() {
        let (name, tag) = split_image("postgres:16-alpine");
        assert_eq!(name, "postgres");
        assert_eq!(tag, "16-alpine");
    }

    #[test]
    fn test_split_image_without_tag_defaults_to_latest() {
        let (name, tag) = split_image("minio/minio");
        assert_eq!(name, "minio/minio");
        assert_eq!(tag, "latest");
    }
}
