//! Options controlling how a log is segmented into runs.

use std::path::Path;
use std::str::FromStr;

use runlineage_types::{LineageError, Result};
use serde::{Deserialize, Serialize};

/// What to do with a run segment that never reached its completion line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardPolicy {
    /// Drop it without a trace.
    #[default]
    Silent,
    /// Drop it and log a warning.
    Warn,
    /// Fail the whole parse.
    Error,
}

impl FromStr for DiscardPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "silent" => Ok(Self::Silent),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown discard policy '{other}', expected silent, warn or error"
            )),
        }
    }
}

/// How a run segment gets its `runId`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunIdStrategy {
    /// SHA-256 of the boundary line's event text and timestamp. Re-running
    /// over the same log reproduces the same ids.
    #[default]
    Hashed,
    /// Fresh random UUID per segment.
    Random,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    #[serde(default)]
    pub discard_policy: DiscardPolicy,
    #[serde(default)]
    pub run_id: RunIdStrategy,
    /// Treat the first line of the log as a boundary even if it is not one.
    ///
    /// Off by default, so only `Environment <name> is active` lines open a
    /// segment. When on, the first line always opens one as well, whatever
    /// it contains.
    #[serde(default)]
    pub open_at_start: bool,
}

impl ParseOptions {
    /// Parse options from YAML text.
    ///
    /// # Errors
    ///
    /// Returns the YAML error message if the text is not valid options YAML.
    pub fn from_yaml_str(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load options from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::NotFound`] if the file is missing, or
    /// [`LineageError::Config`] if it does not parse.
    pub fn from_yaml_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LineageError::NotFound {
                what: "options file",
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content).map_err(|e| LineageError::Config {
            what: "options file",
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_preserve_silent_discard() {
        let options = ParseOptions::default();
        assert_eq!(options.discard_policy, DiscardPolicy::Silent);
        assert_eq!(options.run_id, RunIdStrategy::Hashed);
        assert!(!options.open_at_start);
    }

    #[test]
    fn test_parse_yaml_options() {
        let yaml = "discard_policy: warn\nrun_id: random\nopen_at_start: true\n";
        let options = ParseOptions::from_yaml_str(yaml).unwrap();
        assert_eq!(options.discard_policy, DiscardPolicy::Warn);
        assert_eq!(options.run_id, RunIdStrategy::Random);
        assert!(options.open_at_start);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let options = ParseOptions::from_yaml_str("discard_policy: error\n").unwrap();
        assert_eq!(options.discard_policy, DiscardPolicy::Error);
        assert_eq!(options.run_id, RunIdStrategy::Hashed);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(ParseOptions::from_yaml_str("discard_policy: loud\n").is_err());
        let err = "loud".parse::<DiscardPolicy>().unwrap_err();
        assert!(err.contains("loud"));
    }

    #[rstest]
    #[case("silent", DiscardPolicy::Silent)]
    #[case("warn", DiscardPolicy::Warn)]
    #[case("error", DiscardPolicy::Error)]
    fn test_policy_from_str(#[case] text: &str, #[case] expected: DiscardPolicy) {
        assert_eq!(text.parse::<DiscardPolicy>(), Ok(expected));
        let yaml = format!("discard_policy: {text}\n");
        assert_eq!(ParseOptions::from_yaml_str(&yaml).unwrap().discard_policy, expected);
    }

    #[rstest]
    #[case("Warn")]
    #[case("")]
    #[case("strict")]
    fn test_policy_from_str_rejects(#[case] text: &str) {
        assert!(text.parse::<DiscardPolicy>().is_err());
    }

    #[test]
    fn test_options_file_not_found() {
        let err = ParseOptions::from_yaml_path(Path::new("/nonexistent/options.yaml")).unwrap_err();
        assert!(matches!(err, LineageError::NotFound { .. }));
    }
}
