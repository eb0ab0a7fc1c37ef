//! Orchestrator manifest: the compiled project document listing extractor
//! and loader plugins with their configuration and inheritance links.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Option name → option value, as declared on a plugin element.
pub type PluginConfig = serde_json::Map<String, serde_json::Value>;

/// Which manifest collection a plugin lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    /// Source side of a run (`extractors`).
    Extractor,
    /// Destination side of a run (`loaders`).
    Loader,
}

impl PluginKind {
    /// Name of the manifest collection holding this kind of plugin.
    pub fn collection_name(self) -> &'static str {
        match self {
            Self::Extractor => "extractors",
            Self::Loader => "loaders",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_name())
    }
}

/// One named entry in a manifest collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginElement {
    /// Identifier, unique within its collection.
    pub name: String,
    /// Own configuration; absent and `null` both mean "no options".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<PluginConfig>,
    /// Parent element in the same collection whose config this one extends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_from: Option<String>,
}

impl PluginElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: PluginConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn inheriting(mut self, parent: impl Into<String>) -> Self {
        self.inherit_from = Some(parent.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plugins {
    #[serde(default)]
    pub extractors: Vec<PluginElement>,
    #[serde(default)]
    pub loaders: Vec<PluginElement>,
}

/// Compiled project manifest. Keys other than `plugins.extractors` and
/// `plugins.loaders` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub plugins: Plugins,
}

impl Manifest {
    /// Parse a manifest from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the document does not have manifest shape.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Elements of the collection holding `kind` plugins.
    pub fn collection(&self, kind: PluginKind) -> &[PluginElement] {
        match kind {
            PluginKind::Extractor => &self.plugins.extractors,
            PluginKind::Loader => &self.plugins.loaders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_compiled_manifest() {
        let json = r#"{
            "version": 1,
            "default_environment": "dev",
            "plugins": {
                "extractors": [
                    {"name": "tap-csv", "variant": "meltanolabs", "config": {"delimiter": ","}},
                    {"name": "tap-csv--users", "inherit_from": "tap-csv", "config": null}
                ],
                "loaders": [
                    {"name": "target-jsonl", "config": {"destination_path": "out"}}
                ],
                "utilities": []
            }
        }"#;
        let manifest = Manifest::from_json_str(json).expect("deserialize");
        let extractors = manifest.collection(PluginKind::Extractor);
        assert_eq!(extractors.len(), 2);
        assert_eq!(extractors[1].inherit_from.as_deref(), Some("tap-csv"));
        assert!(extractors[1].config.is_none());
        assert_eq!(manifest.collection(PluginKind::Loader)[0].name, "target-jsonl");
    }

    #[test]
    fn test_missing_collections_default_empty() {
        let manifest = Manifest::from_json_str(r#"{"plugins": {}}"#).expect("deserialize");
        assert!(manifest.collection(PluginKind::Extractor).is_empty());
        assert!(manifest.collection(PluginKind::Loader).is_empty());

        let manifest = Manifest::from_json_str("{}").expect("deserialize");
        assert_eq!(manifest, Manifest::default());
    }

    #[test]
    fn test_element_without_name_is_rejected() {
        let result = Manifest::from_json_str(r#"{"plugins": {"loaders": [{"config": {}}]}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_plugin_kind_display() {
        assert_eq!(PluginKind::Extractor.to_string(), "extractors");
        assert_eq!(PluginKind::Loader.to_string(), "loaders");
    }
}
