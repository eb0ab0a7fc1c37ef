//! Stream schema normalization.

use runlineage_types::lineage::SchemaField;
use runlineage_types::manifest::PluginConfig;
use serde_json::Value;

/// Flatten a JSON-schema `properties` map into field descriptors, in
/// declaration order.
///
/// A `type` given as a list of alternatives collapses to its first entry;
/// a missing or non-string type becomes `None`.
pub fn normalize_properties(properties: &PluginConfig) -> Vec<SchemaField> {
    properties
        .iter()
        .map(|(name, declaration)| SchemaField {
            name: name.clone(),
            field_type: declared_type(declaration),
            description: declaration
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_owned),
        })
        .collect()
}

fn declared_type(declaration: &Value) -> Option<String> {
    match declaration.get("type")? {
        Value::String(name) => Some(name.clone()),
        Value::Array(alternatives) => alternatives.first()?.as_str().map(str::to_owned),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn properties(value: Value) -> PluginConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_keeps_declaration_order() {
        let fields = normalize_properties(&properties(json!({
            "zeta": {"type": "string"},
            "alpha": {"type": "integer"},
        })));
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn test_type_list_collapses_to_first() {
        let fields = normalize_properties(&properties(json!({
            "email": {"type": ["null", "string"], "description": "contact"},
        })));
        assert_eq!(
            fields,
            vec![SchemaField {
                name: "email".into(),
                field_type: Some("null".into()),
                description: Some("contact".into()),
            }]
        );
    }

    #[test]
    fn test_missing_type_and_description() {
        let fields = normalize_properties(&properties(json!({
            "blob": {"anyOf": [{"type": "object"}, {"type": "string"}]},
            "empty_alts": {"type": []},
        })));
        assert!(fields.iter().all(|f| f.field_type.is_none() && f.description.is_none()));
    }

    #[test]
    fn test_empty_properties() {
        assert!(normalize_properties(&PluginConfig::new()).is_empty());
    }
}
