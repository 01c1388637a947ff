//! Resource kinds managed by the console.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::registry::get_resource;

/// Every resource kind that owns a paginated store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Node,
    Instance,
    Domain,
    Vpc,
    Zone,
    Pool,
    Shape,
    Image,
    Disk,
    Datacenter,
    Firewall,
    Balancer,
    Plan,
    Secret,
    Pod,
    Organization,
    Authority,
    Policy,
    Certificate,
    Block,
    Storage,
}

impl ResourceKind {
    /// All kinds, in store registration order
    pub const ALL: [ResourceKind; 21] = [
        ResourceKind::Node,
        ResourceKind::Instance,
        ResourceKind::Domain,
        ResourceKind::Vpc,
        ResourceKind::Zone,
        ResourceKind::Pool,
        ResourceKind::Shape,
        ResourceKind::Image,
        ResourceKind::Disk,
        ResourceKind::Datacenter,
        ResourceKind::Firewall,
        ResourceKind::Balancer,
        ResourceKind::Plan,
        ResourceKind::Secret,
        ResourceKind::Pod,
        ResourceKind::Organization,
        ResourceKind::Authority,
        ResourceKind::Policy,
        ResourceKind::Certificate,
        ResourceKind::Block,
        ResourceKind::Storage,
    ];

    /// Singular name used in action types and API paths
    pub fn name(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Instance => "instance",
            Self::Domain => "domain",
            Self::Vpc => "vpc",
            Self::Zone => "zone",
            Self::Pool => "pool",
            Self::Shape => "shape",
            Self::Image => "image",
            Self::Disk => "disk",
            Self::Datacenter => "datacenter",
            Self::Firewall => "firewall",
            Self::Balancer => "balancer",
            Self::Plan => "plan",
            Self::Secret => "secret",
            Self::Pod => "pod",
            Self::Organization => "organization",
            Self::Authority => "authority",
            Self::Policy => "policy",
            Self::Certificate => "certificate",
            Self::Block => "block",
            Self::Storage => "storage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.name() == s)
    }

    /// Position in [`ResourceKind::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Payload key holding this kind's records in sync responses
    pub fn collection(self) -> String {
        get_resource(self)
            .map(|def| def.collection.clone())
            .unwrap_or_else(|| format!("{}s", self.name()))
    }

    /// API path for list/create/bulk-delete
    pub fn path(self) -> String {
        get_resource(self)
            .map(|def| def.path.clone())
            .unwrap_or_else(|| format!("/{}", self.name()))
    }

    pub fn display_name(self) -> String {
        get_resource(self)
            .map(|def| def.display_name.clone())
            .unwrap_or_else(|| self.name().to_string())
    }

    /// Fields a filter may set for this kind
    pub fn filter_fields(self) -> &'static [String] {
        get_resource(self)
            .map(|def| def.filter_fields.as_slice())
            .unwrap_or_default()
    }

    pub fn admin_only(self) -> bool {
        get_resource(self).is_some_and(|def| def.admin_only)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
