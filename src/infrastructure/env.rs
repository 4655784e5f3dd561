// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Environment detection helpers.

/// Environment variables that identify a CI environment.
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "BUILD_NUMBER",
    "CONTINUOUS_INTEGRATION",
];

/// Whether the process appears to run under a CI system.
#[must_use]
pub fn is_ci() -> bool {
    is_ci_from(|name| std::env::var(name).ok())
}

/// CI detection over an injectable variable lookup.
///
/// A variable set to an empty string or `"false"` does not count; several
/// runners export `CI=false` on local shells.
fn is_ci_from(lookup: impl Fn(&str) -> Option<String>) -> bool {
    CI_VARS.iter().any(|name| {
        lookup(name)
            .map(|value| !value.is_empty() && value != "false")
            .unwrap_or(false)
    })
}

/// Whether verbose debug logging was requested via `DEBUG`.
#[must_use]
pub fn debug_enabled() -> bool {
    std::env::var("DEBUG").is_ok_and(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in<'a>(vars: &'a HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| vars.get(name).map(ToString::to_string)
    }

    #[test]
    fn test_not_ci_when_unset() {
        let vars = HashMap::new();
        assert!(!is_ci_from(lookup_in(&vars)));
    }

    #[test]
    fn test_each_ci_var_detected() {
        for name in CI_VARS {
            let vars = HashMap::from([(*name, "1")]);
            assert!(is_ci_from(lookup_in(&vars)), "{name} should mark CI");
        }
    }

    #[test]
    fn test_ci_false_is_ignored() {
        let vars = HashMap::from([("CI", "false")]);
        assert!(!is_ci_from(lookup_in(&vars)));
    }

    #[test]
    fn test_empty_value_is_ignored() {
        let vars = HashMap::from([("TRAVIS", "")]);
        assert!(!is_ci_from(lookup_in(&vars)));
    }
}
