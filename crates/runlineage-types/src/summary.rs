//! Finalized run summaries.

use std::collections::BTreeSet;

use crate::lineage::{Dataset, Job, Run};

/// Everything learned about one completed run segment.
///
/// Produced by the engine's run accumulator when the completion line is
/// seen; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub producer_name: Option<String>,
    pub consumer_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Streams whose schema was recorded.
    pub streams: BTreeSet<String>,
    pub inputs: Vec<Dataset>,
    pub outputs: Vec<Dataset>,
    /// Run id plus accumulated metrics (always `Some`, possibly empty).
    pub run: Run,
    pub job: Job,
    pub success: bool,
}
