//! Resource Registry - Load resource definitions from JSON
//!
//! Per-kind metadata (API path, payload collection key, filter fields)
//! lives in an embedded JSON file so adding a kind is a data change.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::kind::ResourceKind;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[include_str!("../resources/kinds.json")];

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub display_name: String,
    pub path: String,
    pub collection: String,
    /// Fields the list screen's filter bar can set
    #[serde(default)]
    pub filter_fields: Vec<String>,
    /// Hidden from user sessions; change events are ignored there
    #[serde(default)]
    pub admin_only: bool,
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            resources: HashMap::new(),
        };

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        final_config
    })
}

/// Get a resource definition by kind
pub fn get_resource(kind: ResourceKind) -> Option<&'static ResourceDef> {
    get_registry().resources.get(kind.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = get_registry();
        assert!(
            !registry.resources.is_empty(),
            "Registry should have resources"
        );
    }

    #[test]
    fn test_every_kind_is_defined() {
        for kind in ResourceKind::ALL {
            assert!(get_resource(kind).is_some(), "missing definition for {}", kind);
        }
    }

    #[test]
    fn test_instance_definition() {
        let resource = get_resource(ResourceKind::Instance).unwrap();
        assert_eq!(resource.display_name, "Instances");
        assert_eq!(resource.path, "/instance");
        assert_eq!(resource.collection, "instances");
        assert!(resource.filter_fields.contains(&"name".to_string()));
        assert!(!resource.admin_only);
    }

    #[test]
    fn test_admin_only_kinds() {
        let admin_only: Vec<&str> = ResourceKind::ALL
            .into_iter()
            .filter(|kind| get_resource(*kind).is_some_and(|def| def.admin_only))
            .map(ResourceKind::name)
            .collect();
        assert_eq!(
            admin_only,
            vec!["zone", "datacenter", "authority", "block", "storage"]
        );
    }
}
