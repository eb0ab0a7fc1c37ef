//! Run segmentation.
//!
//! A log is a flat sequence of records from many runs. A boundary line
//! (`Environment <name> is active`) opens a segment; the first line carrying
//! a `success` field closes it. In between, each record is folded into the
//! open segment: plugin names, timestamps, metric totals and stream schemas.
//!
//! [`RunState`] is the whole state machine. It is moved by value through
//! [`RunState::advance`], which returns the next state together with any run
//! that completed or was abandoned on that line. [`RunSegmenter`] drives it
//! over numbered lines and applies the [`DiscardPolicy`].

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use runlineage_types::lineage::{
    add_numbers, Dataset, Job, Run, RunMetrics, DEFAULT_NAMESPACE, PLACEHOLDER_SCHEMA_URL,
};
use runlineage_types::log::{LogRecord, MetaLoggerMessage, MetricPoint, SchemaMessage};
use runlineage_types::manifest::{Manifest, PluginKind};
use runlineage_types::summary::RunSummary;
use runlineage_types::{LineageError, Result};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::config::{DiscardPolicy, ParseOptions, RunIdStrategy};
use crate::resolve::resolve_config;
use crate::schema::normalize_properties;

static BOUNDARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Environment (.*) is active").expect("valid boundary regex")
});

static EMBEDDED_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{.*\}").expect("valid embedded object regex"));

const METRIC_MARKER: &str = "INFO METRIC:";
const SCHEMA_PREFIX: &str = r#"{"type": "SCHEMA""#;
const META_LOGGER_MARKER: &str = "MELTANO-META-LOGGER";

/// Metric types whose values are summed; all others are ignored.
const SUMMED_METRIC_TYPES: [&str; 3] = ["timer", "counter", "sync_duration"];

/// Stand-in for a plugin name the log never mentioned.
const UNKNOWN_PLUGIN: &str = "unknown";

/// Whether `record` opens a new run segment.
pub fn is_boundary(record: &LogRecord) -> bool {
    record
        .event
        .as_deref()
        .is_some_and(|event| BOUNDARY_RE.is_match(event))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn new_run_id(record: &LogRecord, strategy: RunIdStrategy) -> String {
    match strategy {
        RunIdStrategy::Hashed => {
            let seed = format!("{}{}", record.event(), record.timestamp().unwrap_or_default());
            sha256_hex(seed.as_bytes())
        }
        RunIdStrategy::Random => uuid::Uuid::new_v4().to_string(),
    }
}

fn parse_payload<T: DeserializeOwned>(line: usize, kind: &'static str, json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| LineageError::MalformedPayload {
        line,
        kind,
        reason: e.to_string(),
    })
}

/// Where the current line sits and what it is folded against.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    /// 1-based line number in the source file.
    pub line: usize,
    /// Whether this is the first record of the input.
    pub first: bool,
    pub manifest: &'a Manifest,
    pub options: ParseOptions,
}

/// A segment dropped before completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbandonedRun {
    pub run_id: String,
    pub opened_at: usize,
}

/// The segment currently being accumulated.
#[derive(Debug, Clone)]
pub struct ActiveRun {
    opened_at: usize,
    run_id: String,
    producer_name: Option<String>,
    consumer_name: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    streams: BTreeSet<String>,
    inputs: Vec<Dataset>,
    outputs: Vec<Dataset>,
    metrics: RunMetrics,
}

impl ActiveRun {
    fn open(line: usize, record: &LogRecord, strategy: RunIdStrategy) -> Self {
        Self {
            opened_at: line,
            run_id: new_run_id(record, strategy),
            producer_name: None,
            consumer_name: None,
            start_time: None,
            end_time: None,
            streams: BTreeSet::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            metrics: RunMetrics::new(),
        }
    }

    fn abandon(self) -> AbandonedRun {
        AbandonedRun {
            run_id: self.run_id,
            opened_at: self.opened_at,
        }
    }

    fn fold(&mut self, record: &LogRecord, cx: &LineContext<'_>) -> Result<()> {
        if record.is_producer() {
            if let Some(id) = &record.string_id {
                self.producer_name = Some(id.clone());
            }
        }
        if record.is_consumer() {
            if let Some(id) = &record.string_id {
                self.consumer_name = Some(id.clone());
            }
        }

        if let Some(ts) = record.timestamp() {
            if self.start_time.is_none() {
                self.start_time = Some(ts.clone());
            }
            self.end_time = Some(ts);
        }

        let event = record.event();
        if let Some(pos) = event.find(METRIC_MARKER) {
            self.record_metric(cx.line, &event[pos + METRIC_MARKER.len()..])?;
        }
        if event.contains(META_LOGGER_MARKER) {
            self.record_meta_logger(cx.line, record, event)?;
        }
        if event.starts_with(SCHEMA_PREFIX) {
            self.record_schema(record, event, cx)?;
        }
        Ok(())
    }

    fn record_metric(&mut self, line: usize, payload: &str) -> Result<()> {
        let point: MetricPoint = parse_payload(line, "metric", payload.trim())?;
        if !SUMMED_METRIC_TYPES.contains(&point.metric_type.as_str()) {
            tracing::trace!(
                line,
                metric = point.metric,
                metric_type = point.metric_type,
                "Ignoring metric type"
            );
            return Ok(());
        }

        let total = match self.metrics.get(&point.metric) {
            Some(prior) => add_numbers(prior, &point.value),
            None => point.value,
        };
        self.metrics.insert(point.metric, total);
        Ok(())
    }

    fn record_schema(&mut self, record: &LogRecord, event: &str, cx: &LineContext<'_>) -> Result<()> {
        let message: SchemaMessage = parse_payload(cx.line, "schema", event)?;
        if !self.streams.insert(message.stream.clone()) {
            tracing::trace!(line = cx.line, stream = message.stream, "Stream schema already recorded");
            return Ok(());
        }

        let fields = normalize_properties(&message.schema.properties);
        let plugin = record.string_id.as_deref().unwrap_or_default();

        if record.is_producer() {
            let config = resolve_config(cx.manifest, PluginKind::Extractor, plugin)?;
            self.inputs.push(Dataset::new(
                message.stream.clone(),
                fields.clone(),
                PLACEHOLDER_SCHEMA_URL,
                Some(config),
            ));
        }
        if record.is_consumer() {
            let config = resolve_config(cx.manifest, PluginKind::Loader, plugin)?;
            self.outputs.push(Dataset::new(
                message.stream,
                fields,
                PLACEHOLDER_SCHEMA_URL,
                Some(config),
            ));
        }
        Ok(())
    }

    fn record_meta_logger(&mut self, line: usize, record: &LogRecord, event: &str) -> Result<()> {
        let Some(embedded) = EMBEDDED_OBJECT_RE.find(event) else {
            return Err(LineageError::MalformedPayload {
                line,
                kind: "meta-logger",
                reason: "no JSON object in event".to_string(),
            });
        };
        let message: MetaLoggerMessage = parse_payload(line, "meta-logger", embedded.as_str())?;
        let Some(schema) = &message.schema else {
            return Ok(());
        };
        let missing = |field: &str| LineageError::MalformedPayload {
            line,
            kind: "meta-logger",
            reason: format!("missing `{field}`"),
        };

        if record.is_consumer() {
            let uri = message.uri.as_deref().ok_or_else(|| missing("uri"))?;
            self.outputs.push(Dataset::new(
                uri,
                normalize_properties(&schema.properties),
                uri,
                None,
            ));
        }
        if record.is_producer() {
            let uri = message.uri.as_deref().ok_or_else(|| missing("uri"))?;
            let table = message
                .table_name
                .as_deref()
                .ok_or_else(|| missing("table_name"))?;
            self.inputs.push(Dataset::new(
                table,
                normalize_properties(&schema.properties),
                uri,
                None,
            ));
        }
        Ok(())
    }

    fn finish(self, success: bool) -> RunSummary {
        let job = Job {
            namespace: DEFAULT_NAMESPACE.to_string(),
            name: format!(
                "{}-to-{}",
                self.producer_name.as_deref().unwrap_or(UNKNOWN_PLUGIN),
                self.consumer_name.as_deref().unwrap_or(UNKNOWN_PLUGIN),
            ),
        };
        RunSummary {
            producer_name: self.producer_name,
            consumer_name: self.consumer_name,
            start_time: self.start_time,
            end_time: self.end_time,
            streams: self.streams,
            inputs: self.inputs,
            outputs: self.outputs,
            run: Run {
                run_id: self.run_id,
                metrics: Some(self.metrics),
            },
            job,
            success,
        }
    }
}

/// Accumulator state.
#[derive(Debug, Clone, Default)]
pub enum RunState {
    /// Waiting for a boundary line.
    #[default]
    Idle,
    /// Inside a segment.
    Accumulating(Box<ActiveRun>),
}

/// Outcome of folding one record.
#[derive(Debug)]
pub struct Advance {
    pub state: RunState,
    /// Run closed by this record.
    pub completed: Option<RunSummary>,
    /// Run displaced by a boundary on this record.
    pub abandoned: Option<AbandonedRun>,
}

impl RunState {
    fn opens_segment(record: &LogRecord, cx: &LineContext<'_>) -> bool {
        is_boundary(record) || (cx.first && cx.options.open_at_start)
    }

    /// Fold one record, consuming the current state.
    ///
    /// # Errors
    ///
    /// Fails on a malformed embedded payload or cyclic manifest inheritance.
    pub fn advance(self, record: &LogRecord, cx: &LineContext<'_>) -> Result<Advance> {
        let mut abandoned = None;
        let mut state = self;

        if Self::opens_segment(record, cx) {
            if let Self::Accumulating(run) = state {
                abandoned = Some(run.abandon());
            }
            state = Self::Accumulating(Box::new(ActiveRun::open(
                cx.line,
                record,
                cx.options.run_id,
            )));
        }

        let Self::Accumulating(mut run) = state else {
            return Ok(Advance {
                state: Self::Idle,
                completed: None,
                abandoned,
            });
        };

        run.fold(record, cx)?;

        Ok(match record.completion() {
            Some(success) => Advance {
                state: Self::Idle,
                completed: Some(run.finish(success)),
                abandoned,
            },
            None => Advance {
                state: Self::Accumulating(run),
                completed: None,
                abandoned,
            },
        })
    }
}

/// Counters collected while segmenting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentStats {
    pub lines_read: usize,
    pub runs_emitted: usize,
    pub runs_discarded: usize,
}

/// Iterator of completed runs over `(line_number, line)` pairs.
///
/// Stops at the first error.
pub struct RunSegmenter<'a, I> {
    lines: I,
    manifest: &'a Manifest,
    options: ParseOptions,
    state: RunState,
    stats: SegmentStats,
    done: bool,
}

/// Segment `lines` into completed runs.
pub fn segment_runs<'a, I>(
    lines: I,
    manifest: &'a Manifest,
    options: ParseOptions,
) -> RunSegmenter<'a, I::IntoIter>
where
    I: IntoIterator<Item = (usize, String)>,
{
    RunSegmenter {
        lines: lines.into_iter(),
        manifest,
        options,
        state: RunState::Idle,
        stats: SegmentStats::default(),
        done: false,
    }
}

impl<I> RunSegmenter<'_, I> {
    pub fn stats(&self) -> SegmentStats {
        self.stats
    }

    fn step(&mut self, line: usize, text: &str) -> Result<Option<RunSummary>> {
        let record =
            LogRecord::from_line(text).map_err(|source| LineageError::MalformedLine { line, source })?;
        let cx = LineContext {
            line,
            first: self.stats.lines_read == 0,
            manifest: self.manifest,
            options: self.options,
        };
        self.stats.lines_read += 1;

        let advance = std::mem::take(&mut self.state).advance(&record, &cx)?;
        self.state = advance.state;

        if let Some(abandoned) = advance.abandoned {
            self.discard(&abandoned, line)?;
        }
        if let Some(summary) = advance.completed {
            self.stats.runs_emitted += 1;
            tracing::debug!(
                line,
                run_id = summary.run.run_id,
                job = summary.job.name,
                success = summary.success,
                inputs = summary.inputs.len(),
                outputs = summary.outputs.len(),
                "Run segment completed"
            );
            return Ok(Some(summary));
        }
        Ok(None)
    }

    fn discard(&mut self, run: &AbandonedRun, at_line: usize) -> Result<()> {
        self.stats.runs_discarded += 1;
        match self.options.discard_policy {
            DiscardPolicy::Silent => Ok(()),
            DiscardPolicy::Warn => {
                tracing::warn!(
                    run_id = run.run_id,
                    opened_at = run.opened_at,
                    discarded_at = at_line,
                    "Discarding run segment without completion line"
                );
                Ok(())
            }
            DiscardPolicy::Error => Err(LineageError::UnterminatedRun {
                run_id: run.run_id.clone(),
                opened_at: run.opened_at,
            }),
        }
    }
}

impl<I> Iterator for RunSegmenter<'_, I>
where
    I: Iterator<Item = (usize, String)>,
{
    type Item = Result<RunSummary>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while let Some((line, text)) = self.lines.next() {
            match self.step(line, &text) {
                Ok(Some(summary)) => return Some(Ok(summary)),
                Ok(None) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        self.done = true;
        if let RunState::Accumulating(run) = std::mem::take(&mut self.state) {
            let at_line = self.stats.lines_read;
            if let Err(e) = self.discard(&run.abandon(), at_line) {
                return Some(Err(e));
            }
        }
        None
    }
}
