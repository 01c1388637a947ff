//! Actions
//!
//! Messages consumed by the stores. Action emitters build them from API
//! responses; [`Action::from_wire`] and [`Action::to_wire`] speak the
//! `{ "type": "...", "data": { ... } }` JSON shape used by action logs.

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::resource::ResourceKind;
use crate::store::{Filter, ResourceItem};

/// Completion payload: payload key (e.g. `vpcs`) -> records
pub type Completion = BTreeMap<String, Vec<ResourceItem>>;

pub const RESET: &str = "global.reset";
pub const RELOAD: &str = "global.reload";
pub const COMPLETION_SYNC: &str = "completion.sync";
pub const COMPLETION_FILTER: &str = "completion.filter";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Clear every store. `organization` seeds the completion store's
    /// user organization.
    Reset { organization: Option<String> },
    Reload,
    Sync {
        kind: ResourceKind,
        items: Vec<ResourceItem>,
        count: u64,
    },
    Traverse { kind: ResourceKind, page: u64 },
    Filter {
        kind: ResourceKind,
        filter: Option<Filter>,
    },
    CompletionSync { completion: Completion },
    CompletionFilter { filter: Option<Filter> },
}

impl Action {
    /// Resource kind this action targets, `None` for global and
    /// completion actions
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            Self::Sync { kind, .. } | Self::Traverse { kind, .. } | Self::Filter { kind, .. } => {
                Some(*kind)
            }
            _ => None,
        }
    }

    pub fn action_type(&self) -> String {
        match self {
            Self::Reset { .. } => RESET.to_string(),
            Self::Reload => RELOAD.to_string(),
            Self::Sync { kind, .. } => format!("{}.sync", kind.name()),
            Self::Traverse { kind, .. } => format!("{}.traverse", kind.name()),
            Self::Filter { kind, .. } => format!("{}.filter", kind.name()),
            Self::CompletionSync { .. } => COMPLETION_SYNC.to_string(),
            Self::CompletionFilter { .. } => COMPLETION_FILTER.to_string(),
        }
    }

    /// Decode a wire action
    pub fn from_wire(value: &Value) -> Result<Self> {
        let action_type = value
            .get("type")
            .and_then(Value::as_str)
            .context("Action is missing a string \"type\"")?;
        let data = value.get("data").cloned().unwrap_or(Value::Null);

        match action_type {
            RESET => Ok(Self::Reset {
                organization: data
                    .get("organization")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            RELOAD => Ok(Self::Reload),
            COMPLETION_SYNC => {
                let raw: BTreeMap<String, Option<Vec<ResourceItem>>> = serde_json::from_value(
                    data.get("completion").cloned().unwrap_or(Value::Null),
                )
                .context("Failed to parse completion payload")?;
                Ok(Self::CompletionSync {
                    completion: raw
                        .into_iter()
                        .map(|(key, items)| (key, items.unwrap_or_default()))
                        .collect(),
                })
            }
            COMPLETION_FILTER => Ok(Self::CompletionFilter {
                filter: parse_filter(&data)?,
            }),
            other => {
                let (name, verb) = other
                    .split_once('.')
                    .ok_or_else(|| anyhow!("Unknown action type: {}", other))?;
                let kind = ResourceKind::parse(name)
                    .ok_or_else(|| anyhow!("Unknown resource kind in action: {}", other))?;

                match verb {
                    "sync" => {
                        let items: Option<Vec<ResourceItem>> = serde_json::from_value(
                            data.get(kind.collection()).cloned().unwrap_or(Value::Null),
                        )
                        .with_context(|| format!("Failed to parse {} records", kind))?;
                        Ok(Self::Sync {
                            kind,
                            items: items.unwrap_or_default(),
                            count: data.get("count").and_then(Value::as_u64).unwrap_or(0),
                        })
                    }
                    "traverse" => Ok(Self::Traverse {
                        kind,
                        page: data
                            .get("page")
                            .and_then(Value::as_u64)
                            .context("Traverse action is missing \"page\"")?,
                    }),
                    "filter" => Ok(Self::Filter {
                        kind,
                        filter: parse_filter(&data)?,
                    }),
                    _ => Err(anyhow!("Unknown action type: {}", other)),
                }
            }
        }
    }

    /// Encode as a wire action
    pub fn to_wire(&self) -> Value {
        let data = match self {
            Self::Reset { organization } => match organization {
                Some(org) => json!({ "organization": org }),
                None => json!({}),
            },
            Self::Reload => json!({}),
            Self::Sync { kind, items, count } => {
                let mut data = Map::new();
                data.insert(kind.collection(), json!(items));
                data.insert("count".to_string(), json!(count));
                Value::Object(data)
            }
            Self::Traverse { page, .. } => json!({ "page": page }),
            Self::Filter { filter, .. } | Self::CompletionFilter { filter } => {
                json!({ "filter": filter })
            }
            Self::CompletionSync { completion } => json!({ "completion": completion }),
        };

        json!({ "type": self.action_type(), "data": data })
    }
}

fn parse_filter(data: &Value) -> Result<Option<Filter>> {
    match data.get("filter") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(filter)) => Ok(Some(filter.clone())),
        Some(other) => Err(anyhow!("Filter must be an object or null, got {}", other)),
    }
}
