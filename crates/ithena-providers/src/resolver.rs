//! Typed placeholder substitution inside wrapper profile environment maps.
//!
//! Syntax: `{{ type : value }}`, whitespace-tolerant around `type`, `:`, and
//! `value`. Supported types: `env` (parent process environment lookup),
//! `keyring` (OS secret store, value is `service:account`), `file` (read and
//! trim trailing whitespace from file contents).

use std::collections::BTreeMap;

use crate::error::PlaceholderError;

/// The result of resolving every value in an environment map.
///
/// `values` always holds one entry per input key, with every placeholder
/// resolved unless resolution failed partway through that value's string; in
/// that case the value is left with the successfully resolved prefix
/// followed by the original, unresolved remainder (including the failing
/// placeholder itself). `error` carries the first error encountered across
/// the whole map, in key order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedEnv {
    /// Per-key resolved (or partially resolved) values.
    pub values: BTreeMap<String, String>,
    /// The first placeholder error encountered, if any.
    pub error: Option<PlaceholderError>,
}

/// Resolves every placeholder in every value of `env`.
///
/// Does not stop at the first failing key: every key is attempted, so
/// callers get the fullest possible partially-resolved map alongside the
/// first error. See [`resolve_value`] for the per-value stopping rule.
#[must_use]
pub fn resolve_env(env: &BTreeMap<String, String>) -> ResolvedEnv {
    let mut out = ResolvedEnv::default();
    for (key, raw) in env {
        let (resolved, err) = resolve_value(raw);
        out.values.insert(key.clone(), resolved);
        if out.error.is_none() {
            out.error = err;
        }
    }
    out
}

/// Resolves every placeholder in a single string.
///
/// On the first failing placeholder, stops substituting further
/// placeholders in this string and returns the literal remainder of the
/// input (starting at that placeholder) appended to what was already
/// resolved, alongside the error.
#[must_use]
pub fn resolve_value(input: &str) -> (String, Option<PlaceholderError>) {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    loop {
        let Some(start) = rest.find("{{") else {
            output.push_str(rest);
            return (output, None);
        };
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            output.push_str(&rest[start..]);
            return (output, Some(PlaceholderError::Unterminated));
        };
        let body = &after_open[..end];
        let remainder = &after_open[end + 2..];
        match resolve_placeholder(body) {
            Ok(value) => {
                output.push_str(&value);
                rest = remainder;
            }
            Err(e) => {
                output.push_str(&rest[start..]);
                return (output, Some(e));
            }
        }
    }
}

fn resolve_placeholder(body: &str) -> Result<String, PlaceholderError> {
    let (type_part, value_part) = body
        .split_once(':')
        .ok_or_else(|| PlaceholderError::Malformed(body.trim().to_string()))?;
    let kind = type_part.trim();
    let value = value_part.trim();
    match kind {
        "env" => std::env::var(value).map_err(|_| PlaceholderError::EnvNotFound(value.to_string())),
        "keyring" => resolve_keyring(value),
        "file" => resolve_file(value),
        other => Err(PlaceholderError::UnknownType(other.to_string())),
    }
}

fn resolve_keyring(value: &str) -> Result<String, PlaceholderError> {
    let (service, account) = value
        .split_once(':')
        .ok_or_else(|| PlaceholderError::Malformed(value.to_string()))?;
    let entry = keyring::Entry::new(service.trim(), account.trim())
        .map_err(|e| PlaceholderError::Keyring(e.to_string()))?;
    entry.get_password().map_err(|e| PlaceholderError::Keyring(e.to_string()))
}

fn resolve_file(value: &str) -> Result<String, PlaceholderError> {
    std::fs::read_to_string(value)
        .map(|contents| contents.trim_end().to_string())
        .map_err(|e| PlaceholderError::File(value.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn idempotent_on_plain_strings() {
        let (resolved, err) = resolve_value("plain");
        assert_eq!(resolved, "plain");
        assert!(err.is_none());
    }

    #[test]
    fn resolves_env_placeholder() {
        std::env::set_var("ITHENA_TEST_TOK", "abc");
        let (resolved, err) = resolve_value("{{env:ITHENA_TEST_TOK}}");
        assert_eq!(resolved, "abc");
        assert!(err.is_none());
        std::env::remove_var("ITHENA_TEST_TOK");
    }

    #[test]
    fn resolves_file_placeholder_and_trims_trailing_whitespace() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "hello\n").expect("write");
        let path = file.path().to_string_lossy().to_string();
        let (resolved, err) = resolve_value(&format!("{{{{file:{path}}}}}"));
        assert_eq!(resolved, "hello");
        assert!(err.is_none());
    }

    #[test]
    fn unknown_type_is_an_error_and_halts_that_value() {
        let (resolved, err) = resolve_value("pre-{{nope:x}}-post");
        assert_eq!(resolved, "pre-{{nope:x}}-post");
        assert!(matches!(err, Some(PlaceholderError::UnknownType(_))));
    }

    #[test]
    fn whitespace_around_type_colon_value_is_ignored() {
        std::env::set_var("ITHENA_TEST_TOK2", "xyz");
        let (resolved, err) = resolve_value("{{  env  :  ITHENA_TEST_TOK2  }}");
        assert_eq!(resolved, "xyz");
        assert!(err.is_none());
        std::env::remove_var("ITHENA_TEST_TOK2");
    }

    #[test]
    fn missing_env_var_stops_at_first_failure_keeping_prefix() {
        std::env::remove_var("ITHENA_TEST_MISSING");
        let (resolved, err) = resolve_value("a-{{env:ITHENA_TEST_MISSING}}-{{env:PATH}}");
        assert_eq!(resolved, "a-{{env:ITHENA_TEST_MISSING}}-{{env:PATH}}");
        assert!(matches!(err, Some(PlaceholderError::EnvNotFound(_))));
    }

    #[test]
    fn map_resolution_reports_first_error_in_key_order() {
        let mut env = BTreeMap::new();
        env.insert("A".to_string(), "{{env:ITHENA_TEST_TOK3}}".to_string());
        env.insert("Z".to_string(), "{{unknown:zzz}}".to_string());
        std::env::remove_var("ITHENA_TEST_TOK3");
        let result = resolve_env(&env);
        assert!(matches!(result.error, Some(PlaceholderError::EnvNotFound(_))));
        assert_eq!(result.values.len(), 2);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const PLAIN: &str = "[a-zA-Z0-9 _.,/-]{0,24}";
    // Digits-only "type" can never equal "env"/"keyring"/"file".
    const BOGUS_TYPE: &str = "[0-9]{1,6}";

    proptest! {
        /// Any string with no `{{` at all round-trips through `resolve_value`
        /// unchanged and never errors.
        #[test]
        fn plain_text_is_a_fixed_point(s in PLAIN) {
            let (resolved, err) = resolve_value(&s);
            prop_assert_eq!(resolved, s);
            prop_assert!(err.is_none());
        }

        /// A placeholder whose type is never one of `env`/`keyring`/`file`
        /// always halts resolution and leaves the entire input, including
        /// any surrounding plain text, byte-for-byte unchanged.
        #[test]
        fn unknown_type_placeholder_is_returned_verbatim(
            prefix in PLAIN,
            kind in BOGUS_TYPE,
            value in PLAIN,
            suffix in PLAIN,
        ) {
            let input = format!("{prefix}{{{{{kind}:{value}}}}}{suffix}");
            let (resolved, err) = resolve_value(&input);
            prop_assert_eq!(resolved, input);
            prop_assert!(matches!(err, Some(PlaceholderError::UnknownType(_))));
        }

        /// Resolving a map is idempotent per key when every value is plain
        /// text: running it twice never changes the result or introduces an
        /// error.
        #[test]
        fn map_of_plain_values_is_stable(a in PLAIN, b in PLAIN) {
            let mut env = BTreeMap::new();
            env.insert("A".to_string(), a.clone());
            env.insert("B".to_string(), b.clone());
            let first = resolve_env(&env);
            let second = resolve_env(&env);
            prop_assert_eq!(first.values, second.values);
            prop_assert!(first.error.is_none());
            prop_assert!(second.error.is_none());
        }
    }
}
