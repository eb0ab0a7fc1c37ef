use std::collections::BTreeMap;

use proptest::prelude::*;
use runlineage_engine::config::ParseOptions;
use runlineage_engine::resolve::resolve_in;
use runlineage_engine::source::parse_log_str;
use runlineage_types::manifest::{Manifest, PluginConfig, PluginElement};
use serde_json::{json, Value};

fn level_config(keys: &BTreeMap<u8, u8>) -> PluginConfig {
    keys.iter()
        .map(|(k, v)| (format!("k{k}"), json!(v)))
        .collect()
}

proptest! {
    /// Resolving the leaf of a chain equals layering every level's keys over
    /// its parent's, root first.
    #[test]
    fn inheritance_chain_layers_child_over_parent(
        levels in prop::collection::vec(prop::collection::btree_map(0_u8..6, any::<u8>(), 0..4), 1..6)
    ) {
        let elements: Vec<PluginElement> = levels
            .iter()
            .enumerate()
            .map(|(i, keys)| {
                let element = PluginElement::new(format!("p{i}")).with_config(level_config(keys));
                if i == 0 { element } else { element.inheriting(format!("p{}", i - 1)) }
            })
            .collect();

        let mut expected = BTreeMap::new();
        for keys in &levels {
            for (k, v) in keys {
                expected.insert(format!("k{k}"), json!(v));
            }
        }

        let leaf = format!("p{}", levels.len() - 1);
        let resolved = resolve_in(&leaf, &elements, "extractors").unwrap();
        let resolved: BTreeMap<String, Value> = resolved.into_iter().collect();
        prop_assert_eq!(resolved, expected);
    }

    /// Counter totals equal the plain sum; gauges never contribute.
    #[test]
    fn counter_metrics_sum_and_gauges_are_ignored(
        points in prop::collection::vec((0_u32..1000, any::<bool>()), 0..20)
    ) {
        let mut lines = vec![
            json!({"event": "Environment 'dev' is active", "timestamp": "t0"}).to_string(),
        ];
        for (value, is_counter) in &points {
            let metric_type = if *is_counter { "counter" } else { "gauge" };
            let payload = json!({"type": metric_type, "metric": "rows", "value": value, "metric_type": metric_type});
            lines.push(json!({"event": format!("INFO METRIC: {payload}")}).to_string());
        }
        lines.push(json!({"event": "done", "success": true, "timestamp": "t1"}).to_string());

        let report = parse_log_str(&lines.join("\n"), &Manifest::default(), ParseOptions::default()).unwrap();
        let metrics = report.summaries[0].run.metrics.clone().unwrap();

        let counters: Vec<u64> = points.iter().filter(|(_, c)| *c).map(|(v, _)| u64::from(*v)).collect();
        if counters.is_empty() {
            prop_assert!(!metrics.contains_key("rows"));
        } else {
            prop_assert_eq!(metrics["rows"].as_u64(), Some(counters.iter().sum::<u64>()));
        }
    }
}
