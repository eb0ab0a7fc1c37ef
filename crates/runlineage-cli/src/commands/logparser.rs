use std::path::Path;

use anyhow::{Context, Result};
use runlineage_engine::{load_manifest, parse_log_file, project, to_events, ParseOptions};

use super::{deliver, Output};

/// Execute the `logparser` command: locate the project's manifest and JSON
/// logs, emit lineage for every completed run.
pub async fn execute(
    project_dir: &Path,
    environment: Option<&str>,
    output: &Output,
    options: ParseOptions,
) -> Result<()> {
    // 1. Pick the environment
    let environment = match environment {
        Some(env) => env.to_string(),
        None => {
            tracing::info!("No environment provided, using default_environment from meltano.yml");
            project::default_environment(project_dir)?
        }
    };

    // 2. Compile if needed, then load the manifest
    let manifest_path = project::ensure_manifest(project_dir, &environment).await?;
    let manifest = load_manifest(&manifest_path)
        .with_context(|| format!("Failed to load manifest: {}", manifest_path.display()))?;

    // 3. Parse every JSON log file, in logging-config order
    let log_files = project::find_log_files(project_dir)?;
    if log_files.is_empty() {
        tracing::warn!("No JSON log handlers found in logging.yaml");
    }

    let mut pairs = Vec::new();
    let mut discarded = 0;
    for log_file in &log_files {
        let report = parse_log_file(log_file, &manifest, options)
            .with_context(|| format!("Failed to parse log file: {}", log_file.display()))?;
        discarded += report.stats.runs_discarded;
        pairs.extend(report.summaries.iter().map(to_events));
    }

    tracing::info!(
        environment = %environment,
        files = log_files.len(),
        runs = pairs.len(),
        discarded,
        "Collected lineage"
    );

    // 4. Deliver
    deliver(&pairs, output).await
}
