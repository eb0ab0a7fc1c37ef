//! Orchestrator project layout: default environment, compiled manifest
//! location, JSON log discovery and the compile step.

use std::path::{Path, PathBuf};

use runlineage_types::{LineageError, Result};
use serde::Deserialize;

/// Directory holding compiled manifests, relative to the project root.
pub const MANIFEST_DIR: &str = ".meltano/manifests";
pub const PROJECT_FILE: &str = "meltano.yml";
pub const LOGGING_FILE: &str = "logging.yaml";

/// Formatter name marking a handler whose file holds JSON lines.
const JSON_FORMATTER: &str = "json";

#[derive(Debug, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    default_environment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoggingConfig {
    #[serde(default)]
    handlers: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize)]
struct LogHandler {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    formatter: Option<String>,
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path, what: &'static str) -> Result<T> {
    if !path.exists() {
        return Err(LineageError::NotFound {
            what,
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| LineageError::Config {
        what,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Compiled manifest path for `environment`, or the environment-less
/// manifest when `None`.
pub fn manifest_path(project_dir: &Path, environment: Option<&str>) -> PathBuf {
    let file = match environment {
        Some(env) => format!("meltano-manifest.{env}.json"),
        None => "meltano-manifest.json".to_string(),
    };
    project_dir.join(MANIFEST_DIR).join(file)
}

/// `default_environment` declared in the project file.
///
/// # Errors
///
/// Fails if the project file is missing, invalid, or declares no default.
pub fn default_environment(project_dir: &Path) -> Result<String> {
    let path = project_dir.join(PROJECT_FILE);
    let project: ProjectFile = read_yaml(&path, "project file")?;
    project.default_environment.ok_or_else(|| LineageError::Config {
        what: "project file",
        path,
        reason: "no default_environment declared".to_string(),
    })
}

/// Files written by JSON-formatted handlers in the logging config, in
/// declaration order. Relative paths resolve against `project_dir`.
///
/// # Errors
///
/// Fails if the logging config is missing or invalid.
pub fn find_log_files(project_dir: &Path) -> Result<Vec<PathBuf>> {
    let path = project_dir.join(LOGGING_FILE);
    let logging: LoggingConfig = read_yaml(&path, "logging config")?;

    let mut files = Vec::new();
    for (name, handler) in logging.handlers {
        let handler: LogHandler = serde_yaml::from_value(handler).map_err(|e| LineageError::Config {
            what: "logging config",
            path: path.clone(),
            reason: format!("handler {name:?}: {e}"),
        })?;
        if handler.formatter.as_deref() != Some(JSON_FORMATTER) {
            continue;
        }
        if let Some(filename) = handler.filename {
            files.push(project_dir.join(filename));
        }
    }

    tracing::debug!(config = %path.display(), files = files.len(), "Discovered JSON log files");
    Ok(files)
}

/// Run `meltano compile` in `project_dir`.
///
/// # Errors
///
/// Returns [`LineageError::Compile`] on a non-zero exit and
/// [`LineageError::Io`] if the command cannot be spawned.
pub async fn compile_project(project_dir: &Path) -> Result<()> {
    let status = tokio::process::Command::new("meltano")
        .arg("compile")
        .current_dir(project_dir)
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(LineageError::Compile(match status.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }))
    }
}

/// Manifest path for `environment`, compiling the project first if it has
/// not been compiled yet.
///
/// # Errors
///
/// Fails if compilation fails.
pub async fn ensure_manifest(project_dir: &Path, environment: &str) -> Result<PathBuf> {
    let path = manifest_path(project_dir, Some(environment));
    if !path.exists() {
        tracing::info!(
            manifest = %path.display(),
            "Manifest not found, invoking `meltano compile`"
        );
        compile_project(project_dir).await?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_path_by_environment() {
        let root = Path::new("/proj");
        assert_eq!(
            manifest_path(root, Some("dev")),
            PathBuf::from("/proj/.meltano/manifests/meltano-manifest.dev.json")
        );
        assert_eq!(
            manifest_path(root, None),
            PathBuf::from("/proj/.meltano/manifests/meltano-manifest.json")
        );
    }

    #[test]
    fn test_default_environment() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_FILE),
            "version: 1\ndefault_environment: staging\nenvironments:\n  - name: staging\n",
        )
        .unwrap();
        assert_eq!(default_environment(dir.path()).unwrap(), "staging");
    }

    #[test]
    fn test_default_environment_missing_key() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE), "version: 1\n").unwrap();
        let err = default_environment(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no default_environment"));
    }

    #[test]
    fn test_default_environment_no_project_file() {
        let dir = tempdir().unwrap();
        let err = default_environment(dir.path()).unwrap_err();
        assert!(matches!(err, LineageError::NotFound { what: "project file", .. }));
    }

    #[test]
    fn test_find_log_files_keeps_json_handlers_in_order() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(LOGGING_FILE),
            r"
version: 1
formatters:
  json:
    (): meltano.core.logging.json_formatter
handlers:
  console:
    class: logging.StreamHandler
    formatter: default
  file_json:
    class: logging.FileHandler
    formatter: json
    filename: logs/meltano.log
  plain_file:
    class: logging.FileHandler
    formatter: default
    filename: logs/plain.log
  second_json:
    class: logging.FileHandler
    formatter: json
    filename: /var/log/meltano.json
",
        )
        .unwrap();

        let files = find_log_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("logs/meltano.log"),
                PathBuf::from("/var/log/meltano.json"),
            ]
        );
    }

    #[test]
    fn test_find_log_files_without_handlers() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(LOGGING_FILE), "version: 1\n").unwrap();
        assert!(find_log_files(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_manifest_skips_compile_when_present() {
        let dir = tempdir().unwrap();
        let path = manifest_path(dir.path(), Some("dev"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(ensure_manifest(dir.path(), "dev").await.unwrap(), path);
    }
}
