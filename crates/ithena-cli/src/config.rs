//! Wrapper profile configuration: YAML file loading and CLI-flag merge.
//!
//! Precedence: CLI flags > profile file values > built-in defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ithena_core::WrapperProfile;
use serde::Deserialize;

use crate::error::CliError;

const DEFAULT_OBSERVE_URL: &str = "https://ingest.ithena.dev/v1/audit";

#[derive(Debug, Deserialize)]
struct WrappersFile {
    wrappers: BTreeMap<String, ProfileEntry>,
}

#[derive(Debug, Deserialize)]
struct ProfileEntry {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    alias: Option<String>,
}

/// Returns the default wrapper-config search path list, in search order:
/// `./.ithena-wrappers.yaml`, then `<user_config_dir>/ithena-cli/wrappers.yaml`.
#[must_use]
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".ithena-wrappers.yaml")];
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    paths.push(base.join("ithena-cli").join("wrappers.yaml"));
    paths
}

/// Loads `profile_name` from `explicit_path`, or the default search path if
/// `explicit_path` is `None`.
///
/// # Errors
/// Returns [`CliError::InputParse`] if no config file is found, the file is
/// malformed YAML, or the named profile is absent from it.
pub fn load_profile(profile_name: &str, explicit_path: Option<&Path>) -> Result<WrapperProfile, CliError> {
    let candidates: Vec<PathBuf> = match explicit_path {
        Some(p) => vec![p.to_path_buf()],
        None => default_search_paths(),
    };

    for path in &candidates {
        if !path.exists() {
            continue;
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::InputParse(format!("failed to read {}: {e}", path.display())))?;
        let parsed: WrappersFile = serde_yaml::from_str(&text)
            .map_err(|e| CliError::InputParse(format!("malformed YAML in {}: {e}", path.display())))?;
        let entry = parsed
            .wrappers
            .get(profile_name)
            .ok_or_else(|| CliError::InputParse(format!("profile '{profile_name}' not found in {}", path.display())))?;
        return Ok(WrapperProfile {
            command: entry.command.clone(),
            args: entry.args.clone(),
            env: entry.env.clone(),
            alias: entry.alias.clone(),
        });
    }

    Err(CliError::InputParse(format!(
        "no wrapper config file found (looked in {})",
        candidates.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    )))
}

/// Resolves the effective observe-url: the `--observe-url` flag if given,
/// else the built-in default.
#[must_use]
pub fn resolve_observe_url(flag: Option<String>) -> String {
    flag.unwrap_or_else(|| DEFAULT_OBSERVE_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_named_profile_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "wrappers:\n  demo:\n    command: echo\n    args: [\"hi\"]\n    env:\n      A: \"{{{{env:PATH}}}}\"\n    alias: demo-alias\n"
        )
        .expect("write");
        let profile = load_profile("demo", Some(file.path())).expect("load");
        assert_eq!(profile.command, "echo");
        assert_eq!(profile.args, vec!["hi".to_string()]);
        assert_eq!(profile.alias.as_deref(), Some("demo-alias"));
    }

    #[test]
    fn missing_profile_is_an_input_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "wrappers:\n  other:\n    command: echo\n").expect("write");
        let err = load_profile("demo", Some(file.path())).expect_err("should fail");
        assert!(matches!(err, CliError::InputParse(_)));
    }

    #[test]
    fn observe_url_flag_overrides_default() {
        assert_eq!(resolve_observe_url(Some("https://custom".to_string())), "https://custom");
        assert_eq!(resolve_observe_url(None), DEFAULT_OBSERVE_URL);
    }
}
