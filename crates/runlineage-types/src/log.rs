//! Structured log lines emitted by the orchestrator, and the payloads
//! embedded in their `event` text.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::manifest::PluginConfig;

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// Keeps an explicit `null` distinguishable from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// One parsed line of the orchestrator's JSON log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub producer: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub consumer: Option<Value>,
    /// Name of the extractor or loader that emitted the line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_id: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub success: Option<Value>,
}

impl LogRecord {
    /// Parse a single log line.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the line is not a JSON object of log shape.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Event text, or `""` when the line has none.
    pub fn event(&self) -> &str {
        self.event.as_deref().unwrap_or_default()
    }

    /// Timestamp as text. Falsy values count as absent; non-string values
    /// are rendered as their JSON text.
    pub fn timestamp(&self) -> Option<String> {
        match self.timestamp.as_ref().filter(|ts| is_truthy(ts))? {
            Value::String(ts) => Some(ts.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn is_producer(&self) -> bool {
        self.producer.as_ref().is_some_and(is_truthy)
    }

    pub fn is_consumer(&self) -> bool {
        self.consumer.as_ref().is_some_and(is_truthy)
    }

    /// `Some(succeeded)` when the line carries the completion field.
    pub fn completion(&self) -> Option<bool> {
        self.success.as_ref().map(is_truthy)
    }
}

/// Payload of an `INFO METRIC:` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub metric_type: String,
    pub metric: String,
    pub value: Number,
    #[serde(default)]
    pub tags: PluginConfig,
}

/// `schema` object of a stream declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSchema {
    #[serde(default)]
    pub properties: PluginConfig,
}

/// Payload of a `{"type": "SCHEMA", ...}` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMessage {
    pub stream: String,
    pub schema: StreamSchema,
}

/// JSON payload embedded in a `MELTANO-META-LOGGER` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaLoggerMessage {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub schema: Option<StreamSchema>,
}
