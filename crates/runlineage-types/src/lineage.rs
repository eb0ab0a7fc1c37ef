//! OpenLineage-style run events.
//!
//! Field names and casing match the lineage collector's JSON schema
//! (`eventType`, `runId`, `_schemaURL`, ...), so these types serialize
//! straight onto the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::manifest::PluginConfig;

/// Namespace used for jobs and datasets derived from orchestrator logs.
pub const DEFAULT_NAMESPACE: &str = "meltano";

/// `producer` URL stamped on every event.
pub const EVENT_PRODUCER: &str = "https://meltano.com";

/// `_producer` tag on schema facets.
pub const SCHEMA_PRODUCER: &str = "meltano";

/// Placeholder `_schemaURL` for stream-declared schemas.
pub const PLACEHOLDER_SCHEMA_URL: &str = "https://example.com";

/// Metric name → accumulated total.
pub type RunMetrics = BTreeMap<String, Number>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Start,
    Complete,
    Fail,
}

/// Field descriptor inside a schema facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFacet {
    pub fields: Vec<SchemaField>,
    #[serde(rename = "_producer")]
    pub producer: String,
    #[serde(rename = "_schemaURL")]
    pub schema_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetFacets {
    pub schema: SchemaFacet,
    /// Snapshot of the resolved plugin config; `null` when none applies.
    pub config: Option<PluginConfig>,
}

/// An input or output dataset of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub namespace: String,
    pub name: String,
    pub facets: DatasetFacets,
}

impl Dataset {
    /// Dataset in the default namespace with a `meltano`-tagged schema facet.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<SchemaField>,
        schema_url: impl Into<String>,
        config: Option<PluginConfig>,
    ) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            name: name.into(),
            facets: DatasetFacets {
                schema: SchemaFacet {
                    fields,
                    producer: SCHEMA_PRODUCER.to_string(),
                    schema_url: schema_url.into(),
                },
                config,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: String,
    /// Present on terminal events only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RunMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub namespace: String,
    pub name: String,
}

/// A single lineage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub event_type: EventType,
    pub event_time: Option<String>,
    pub run: Run,
    pub job: Job,
    pub inputs: Vec<Dataset>,
    pub outputs: Vec<Dataset>,
    pub producer: String,
}

/// Add two metric values, staying integral when both sides are integers
/// and the sum does not overflow.
pub fn add_numbers(lhs: &Number, rhs: &Number) -> Number {
    if let (Some(a), Some(b)) = (lhs.as_i64(), rhs.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Number::from(sum);
        }
    }
    if let (Some(a), Some(b)) = (lhs.as_u64(), rhs.as_u64()) {
        if let Some(sum) = a.checked_add(b) {
            return Number::from(sum);
        }
    }
    let sum = lhs.as_f64().unwrap_or_default() + rhs.as_f64().unwrap_or_default();
    Number::from_f64(sum).unwrap_or_else(|| lhs.clone())
}
