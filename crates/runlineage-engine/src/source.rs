//! File inputs: the manifest and the JSON log.

use std::path::Path;

use runlineage_types::manifest::Manifest;
use runlineage_types::summary::RunSummary;
use runlineage_types::{LineageError, Result};

use crate::accumulator::{segment_runs, SegmentStats};
use crate::config::ParseOptions;

/// Completed runs of one log file plus segmentation counters.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub summaries: Vec<RunSummary>,
    pub stats: SegmentStats,
}

fn ensure_exists(path: &Path, what: &'static str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(LineageError::NotFound {
            what,
            path: path.to_path_buf(),
        })
    }
}

/// Load and parse a compiled manifest.
///
/// # Errors
///
/// Returns [`LineageError::NotFound`] if the file does not exist and
/// [`LineageError::Manifest`] if it is not a valid manifest.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    ensure_exists(path, "manifest file")?;
    let content = std::fs::read_to_string(path)?;
    let manifest = Manifest::from_json_str(&content).map_err(|source| LineageError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        path = %path.display(),
        extractors = manifest.plugins.extractors.len(),
        loaders = manifest.plugins.loaders.len(),
        "Loaded manifest"
    );
    Ok(manifest)
}

/// Number the non-blank lines of `content`, starting at 1.
pub fn numbered_lines(content: &str) -> Vec<(usize, String)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect()
}

/// Read a JSON-lines log file into numbered lines.
///
/// # Errors
///
/// Returns [`LineageError::NotFound`] if the file does not exist.
pub fn read_log(path: &Path) -> Result<Vec<(usize, String)>> {
    ensure_exists(path, "log file")?;
    let content = std::fs::read_to_string(path)?;
    Ok(numbered_lines(&content))
}

/// Segment already-read log text into completed runs.
///
/// # Errors
///
/// Propagates the first segmentation error.
pub fn parse_log_str(content: &str, manifest: &Manifest, options: ParseOptions) -> Result<ParseReport> {
    let mut segmenter = segment_runs(numbered_lines(content), manifest, options);
    let summaries = segmenter.by_ref().collect::<Result<Vec<_>>>()?;
    Ok(ParseReport {
        summaries,
        stats: segmenter.stats(),
    })
}

/// Read and segment a whole log file.
///
/// # Errors
///
/// Fails if the file is missing, a line is malformed, or segmentation
/// fails under the configured discard policy.
pub fn parse_log_file(path: &Path, manifest: &Manifest, options: ParseOptions) -> Result<ParseReport> {
    let lines = read_log(path)?;
    let mut segmenter = segment_runs(lines, manifest, options);
    let summaries = segmenter
        .by_ref()
        .collect::<Result<Vec<_>>>()?;
    let stats = segmenter.stats();

    tracing::info!(
        path = %path.display(),
        lines = stats.lines_read,
        runs = stats.runs_emitted,
        discarded = stats.runs_discarded,
        "Parsed log file"
    );
    Ok(ParseReport { summaries, stats })
}
