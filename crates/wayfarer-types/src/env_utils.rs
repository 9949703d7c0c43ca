//! Environment variable parsing utilities.
//!
//! Type-safe helpers for reading configuration from the environment with
//! default values, replacing repeated boilerplate like:
//!
//! ```ignore
//! std::env::var("VAR_NAME")
//!     .ok()
//!     .and_then(|v| v.parse::<u64>().ok())
//!     .unwrap_or(default_value)
//! ```

use std::str::FromStr;

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set, empty, or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| v.parse().ok())
}

/// Parse an environment variable with a default value.
///
/// Returns the default if the variable is not set or cannot be parsed.
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Read a boolean flag: `1`, `true`, `yes`, and `on` (case-insensitive)
/// count as set.
pub fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variables_fall_back() {
        assert_eq!(env_var::<u64>("WAYFARER_TEST_UNSET_VAR"), None);
        assert_eq!(env_var_or("WAYFARER_TEST_UNSET_VAR", 42u64), 42);
        assert!(!env_bool("WAYFARER_TEST_UNSET_VAR"));
    }

    #[test]
    fn set_variables_parse() {
        std::env::set_var("WAYFARER_TEST_SET_VAR", "17");
        assert_eq!(env_var::<u64>("WAYFARER_TEST_SET_VAR"), Some(17));
        std::env::set_var("WAYFARER_TEST_BOOL_VAR", "Yes");
        assert!(env_bool("WAYFARER_TEST_BOOL_VAR"));
        std::env::remove_var("WAYFARER_TEST_SET_VAR");
        std::env::remove_var("WAYFARER_TEST_BOOL_VAR");
    }
}
