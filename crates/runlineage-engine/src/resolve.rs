//! Effective plugin configuration along `inherit_from` chains.

use runlineage_types::manifest::{Manifest, PluginConfig, PluginElement, PluginKind};
use runlineage_types::{LineageError, Result};

/// First element of `elements` named `name`.
pub fn find_element<'a>(name: &str, elements: &'a [PluginElement]) -> Option<&'a PluginElement> {
    elements.iter().find(|element| element.name == name)
}

/// Resolve the effective config of plugin `name` of the given kind.
///
/// # Errors
///
/// Returns [`LineageError::CyclicInheritance`] if the chain loops.
pub fn resolve_config(manifest: &Manifest, kind: PluginKind, name: &str) -> Result<PluginConfig> {
    resolve_in(name, manifest.collection(kind), kind.collection_name())
}

/// Resolve the effective config of `name` within one collection.
///
/// Parent config is resolved first and the element's own keys are laid
/// over it, so the child wins on overlap and nothing from the parent is
/// lost. An unknown name, including an unknown `inherit_from` target,
/// contributes an empty map.
///
/// # Errors
///
/// Returns [`LineageError::CyclicInheritance`] naming the full chain when an
/// element is reached twice.
pub fn resolve_in(name: &str, elements: &[PluginElement], collection: &str) -> Result<PluginConfig> {
    let mut chain = Vec::new();
    resolve_chain(name, elements, collection, &mut chain)
}

fn resolve_chain(
    name: &str,
    elements: &[PluginElement],
    collection: &str,
    chain: &mut Vec<String>,
) -> Result<PluginConfig> {
    if chain.iter().any(|visited| visited == name) {
        let mut cycle = chain.clone();
        cycle.push(name.to_string());
        return Err(LineageError::CyclicInheritance {
            collection: collection.to_string(),
            chain: cycle,
        });
    }

    let Some(element) = find_element(name, elements) else {
        return Ok(PluginConfig::new());
    };
    chain.push(name.to_string());

    let own = element.config.clone().unwrap_or_default();
    let resolved = match element.inherit_from.as_deref().filter(|p| !p.is_empty()) {
        Some(parent) => {
            let mut merged = resolve_chain(parent, elements, collection, chain)?;
            merged.extend(own);
            merged
        }
        None => own,
    };

    tracing::trace!(
        collection,
        plugin = name,
        depth = chain.len(),
        keys = resolved.len(),
        "Resolved plugin config"
    );
    Ok(resolved)
}
