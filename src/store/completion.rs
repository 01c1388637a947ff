//! Completion Store
//!
//! Unpaginated snapshot of many resource kinds at once, used to resolve
//! references across resources (an instance row showing its VPC's name,
//! an organization name from an id) without a fetch per reference.
//!
//! Subnets only ever arrive nested inside their owning records; a sync
//! flattens them into their own `subnets` collection so they can be
//! looked up by id like any other kind.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::action::{Action, Completion};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::emitter::{ChangeEmitter, ChangeQueue, ListenerId};

use super::item::{Filter, Item, ResourceItem};

/// Cached snapshot: payload key -> records
pub type CompletionData = BTreeMap<String, Arc<[Item]>>;

/// Key of the flattened subnet collection
pub const SUBNETS: &str = "subnets";

/// Payload key that is indexed but never searched for nested subnets
const UNFLATTENED_KEY: &str = "vpc";

/// Who is signed in. A `User` session is scoped to one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Admin,
    User,
}

#[derive(Debug, Default)]
struct CompletionState {
    data: Arc<CompletionData>,
    index: HashMap<String, HashMap<String, usize>>,
    user_organization: Option<String>,
    filter: Option<Filter>,
}

#[derive(Debug)]
pub struct CompletionStore {
    session: SessionMode,
    state: RwLock<CompletionState>,
    emitter: Arc<ChangeEmitter>,
    changes: Arc<ChangeQueue>,
}

macro_rules! completion_getters {
    ($($list:ident, $one:ident => $key:literal;)*) => {
        $(
            pub fn $list(&self) -> Arc<[Item]> {
                self.resources($key)
            }

            pub fn $one(&self, id: &str) -> Option<Item> {
                self.resource($key, id)
            }
        )*
    };
}

impl CompletionStore {
    /// Create the store and register it with the dispatcher
    pub fn register(
        dispatcher: &Dispatcher,
        session: SessionMode,
    ) -> Result<Arc<Self>, DispatchError> {
        let store = Arc::new(Self {
            session,
            state: RwLock::new(CompletionState::default()),
            emitter: Arc::new(ChangeEmitter::new()),
            changes: dispatcher.changes(),
        });

        let handler = store.clone();
        dispatcher.register(move |action| handler.handle(action))?;

        Ok(store)
    }

    pub fn session(&self) -> SessionMode {
        self.session
    }

    /// Whole snapshot, including the flattened subnets
    pub fn completion(&self) -> Arc<CompletionData> {
        self.state.read().data.clone()
    }

    /// Records under `key`; empty when the key is absent
    pub fn resources(&self, key: &str) -> Arc<[Item]> {
        self.state
            .read()
            .data
            .get(key)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub fn resource(&self, key: &str, id: &str) -> Option<Item> {
        let state = self.state.read();
        let i = *state.index.get(key)?.get(id)?;
        state.data.get(key)?.get(i).cloned()
    }

    completion_getters! {
        organizations, organization => "organizations";
        authorities, authority => "authorities";
        policies, policy => "policies";
        domains, domain => "domains";
        balancers, balancer => "balancers";
        vpcs, vpc => "vpcs";
        subnets, subnet => "subnets";
        datacenters, datacenter => "datacenters";
        blocks, block => "blocks";
        nodes, node => "nodes";
        disks, disk => "disks";
        pools, pool => "pools";
        zones, zone => "zones";
        shapes, shape => "shapes";
        images, image => "images";
        storages, storage => "storages";
        builds, build => "builds";
        instances, instance => "instances";
        firewalls, firewall => "firewalls";
        plans, plan => "plans";
        certificates, certificate => "certificates";
        secrets, secret => "secrets";
        pods, pod => "pods";
        units, unit => "units";
    }

    pub fn user_organization(&self) -> Option<String> {
        self.state.read().user_organization.clone()
    }

    pub fn filter(&self) -> Option<Filter> {
        self.state.read().filter.clone()
    }

    pub fn add_change_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        self.emitter.add_listener(listener)
    }

    pub fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.emitter.remove_listener(id)
    }

    fn emit_change(&self) {
        self.changes.defer(&self.emitter);
    }

    fn handle(&self, action: &Action) {
        match action {
            Action::Reset { organization } => self.reset(organization.clone()),
            Action::Reload => self.emit_change(),
            Action::CompletionFilter { filter } => {
                self.state.write().filter = filter.clone();
                self.emit_change();
            }
            Action::CompletionSync { completion } => self.sync(completion),
            _ => {}
        }
    }

    fn reset(&self, organization: Option<String>) {
        *self.state.write() = CompletionState {
            user_organization: organization,
            ..CompletionState::default()
        };
        self.emit_change();
    }

    fn sync(&self, completion: &Completion) {
        let mut data = CompletionData::new();
        let mut index = HashMap::new();
        let mut subnets = Vec::new();

        for (key, items) in completion {
            if key != UNFLATTENED_KEY {
                for item in items {
                    collect_subnets(item, &mut subnets);
                }
            }

            let items: Arc<[Item]> = items.iter().cloned().map(Arc::new).collect();
            index.insert(key.clone(), index_of(&items));
            data.insert(key.clone(), items);
        }

        let subnets: Arc<[Item]> = subnets.into_iter().map(Arc::new).collect();
        index.insert(SUBNETS.to_string(), index_of(&subnets));
        data.insert(SUBNETS.to_string(), subnets);

        {
            let mut state = self.state.write();

            if self.session == SessionMode::User && state.user_organization.is_none() {
                state.user_organization = data
                    .get("organizations")
                    .and_then(|orgs| orgs.first())
                    .map(|org| org.id.clone());
            }

            tracing::debug!(
                "completion sync: {} kinds, {} subnets",
                data.len() - 1,
                data.get(SUBNETS).map_or(0, |s| s.len())
            );

            state.data = Arc::new(data);
            state.index = index;
        }

        self.emit_change();
    }
}

fn index_of(items: &[Item]) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id.clone(), i))
        .collect()
}

fn collect_subnets(item: &ResourceItem, subnets: &mut Vec<ResourceItem>) {
    let Some(Value::Array(nested)) = item.fields.get(SUBNETS) else {
        return;
    };

    for subnet in nested {
        match serde_json::from_value::<ResourceItem>(subnet.clone()) {
            Ok(subnet) => subnets.push(subnet),
            Err(e) => tracing::warn!("Skipping subnet without id under {}: {}", item.id, e),
        }
    }
}
