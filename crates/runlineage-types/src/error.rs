//! Error model shared by the engine and its adapters.

use std::path::PathBuf;

/// Errors raised while turning run logs into lineage events.
///
/// Every variant is fatal to the current invocation; nothing in the
/// pipeline retries.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LineageError {
    /// A log line was not a JSON object.
    #[error("line {line}: malformed log record: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A payload embedded in a log event (metric, schema, meta-logger) did
    /// not parse.
    #[error("line {line}: malformed {kind} payload: {reason}")]
    MalformedPayload {
        line: usize,
        kind: &'static str,
        reason: String,
    },

    /// An `inherit_from` chain loops back onto itself.
    #[error("cyclic inheritance in {collection}: {}", chain.join(" -> "))]
    CyclicInheritance {
        collection: String,
        chain: Vec<String>,
    },

    /// A run segment was abandoned before its completion line.
    #[error("run {run_id} opened at line {opened_at} was never completed")]
    UnterminatedRun { run_id: String, opened_at: usize },

    /// A required input file does not exist.
    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// The manifest document is not valid JSON of the expected shape.
    #[error("invalid manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A YAML configuration file (project, logging, options) is invalid.
    #[error("invalid {what} {}: {reason}", path.display())]
    Config {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// The orchestrator's compile step exited unsuccessfully.
    #[error("orchestrator compile failed: {0}")]
    Compile(String),

    /// The lineage endpoint answered with a non-success status.
    #[error("error posting lineage event: {status}, {body}")]
    Publish { status: u16, body: String },

    /// The lineage endpoint could not be reached.
    #[error("lineage transport: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// File-system I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing an event failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, LineageError>;
