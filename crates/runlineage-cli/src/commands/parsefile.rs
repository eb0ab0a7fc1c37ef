use std::path::Path;

use anyhow::{Context, Result};
use runlineage_engine::{load_manifest, parse_log_file, to_events, ParseOptions};

use super::{deliver, Output};

/// Execute the `parsefile` command: parse one log file and print its events.
pub async fn execute(log_path: &Path, manifest_path: &Path, options: ParseOptions) -> Result<()> {
    // 1. Load inputs (both must exist before anything is parsed)
    let manifest = load_manifest(manifest_path)
        .with_context(|| format!("Failed to load manifest: {}", manifest_path.display()))?;

    // 2. Segment into runs
    let report = parse_log_file(log_path, &manifest, options)
        .with_context(|| format!("Failed to parse log file: {}", log_path.display()))?;

    // 3. Map and print
    let pairs: Vec<_> = report.summaries.iter().map(to_events).collect();
    deliver(&pairs, &Output::default()).await
}
