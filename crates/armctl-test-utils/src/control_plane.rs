//! In-memory SQL server control plane
//!
//! Implements [`SqlServerOperations`] over a map of servers so stateful
//! create, update and delete scenarios run without a cloud account. Two
//! races of a shared account can be staged: a server removed by another
//! actor just before our delete lands, and reads that keep seeing a server
//! after its delete completed. Call-level expectations belong in
//! `MockSqlServerOperations`, not here.

use crate::env::get_subscription_id;
use armctl::arm::{
    ArmError, DeclaredResource, DeleteResponse, DeletionHandle, ResourceRef, ServerProperties,
    ServerSnapshot, SqlServerOperations,
};
use armctl_common::defaults::{SQL_PROVIDER, SQL_SERVERS_COLLECTION};
use armctl_common::resource_id::ResourceId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type Key = (String, String);

fn key(resource_group: &str, name: &str) -> Key {
    (resource_group.to_string(), name.to_string())
}

#[derive(Default)]
struct State {
    servers: BTreeMap<Key, ServerSnapshot>,
    /// Deleted servers still served to `get`, with the reads left
    lingering: HashMap<Key, (ServerSnapshot, u32)>,
    vanish_on_delete: HashSet<String>,
    stale_reads: HashMap<String, u32>,
}

/// Shared, cloneable in-memory control plane
#[derive(Clone)]
pub struct InMemoryControlPlane {
    subscription_id: String,
    delete_latency: Duration,
    state: Arc<Mutex<State>>,
}

/// Uses the subscription from `ARM_SUBSCRIPTION_ID`.
impl Default for InMemoryControlPlane {
    fn default() -> Self {
        Self::new(get_subscription_id())
    }
}

impl InMemoryControlPlane {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            delete_latency: Duration::ZERO,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Control plane under a fresh random subscription, so minted
    /// identifiers never collide with another plane's.
    pub fn isolated() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// Make every delete take `latency` before it completes.
    pub fn with_delete_latency(mut self, latency: Duration) -> Self {
        self.delete_latency = latency;
        self
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not wedge every other assertion.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Canonical identifier the control plane mints for a server
    pub fn server_id(&self, resource_group: &str, name: &str) -> String {
        ResourceId::new(
            &self.subscription_id,
            resource_group,
            SQL_PROVIDER,
            SQL_SERVERS_COLLECTION,
            name,
        )
        .to_string()
    }

    /// Add a server as if something outside the test had created it.
    pub fn seed(&self, resource_group: &str, name: &str, location: &str) -> ServerSnapshot {
        let snapshot = ServerSnapshot {
            id: self.server_id(resource_group, name),
            name: name.to_string(),
            location: location.to_string(),
            tags: BTreeMap::new(),
            properties: ServerProperties {
                state: Some("Ready".to_string()),
                ..Default::default()
            },
        };
        self.insert(resource_group, snapshot.clone());
        snapshot
    }

    /// Store a snapshot verbatim, identifier included.
    pub fn insert(&self, resource_group: &str, snapshot: ServerSnapshot) {
        let key = key(resource_group, &snapshot.name);
        self.state().servers.insert(key, snapshot);
    }

    /// Remove a server without going through `delete`.
    pub fn remove(&self, resource_group: &str, name: &str) -> Option<ServerSnapshot> {
        self.state().servers.remove(&key(resource_group, name))
    }

    pub fn contains(&self, resource_group: &str, name: &str) -> bool {
        self.state().servers.contains_key(&key(resource_group, name))
    }

    /// Names of every stored server, sorted
    pub fn server_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().servers.keys().map(|(_, n)| n.clone()).collect();
        names.sort();
        names
    }

    /// Make `name` disappear right before a delete for it is applied.
    pub fn vanish_on_delete(&self, name: &str) {
        self.state().vanish_on_delete.insert(name.to_string());
    }

    /// Keep `name` visible to `get` for `reads` calls after it is deleted.
    pub fn stale_reads_after_delete(&self, name: &str, reads: u32) {
        self.state().stale_reads.insert(name.to_string(), reads);
    }

    fn apply_delete(&self, target: &ResourceRef) -> Result<DeleteResponse, ArmError> {
        let mut guard = self.state();
        let state = &mut *guard;
        let key = key(&target.resource_group, &target.name);

        if state.vanish_on_delete.remove(&target.name) {
            state.servers.remove(&key);
        }

        match state.servers.remove(&key) {
            Some(snapshot) => {
                match state.stale_reads.remove(&target.name) {
                    Some(reads) if reads > 0 => {
                        state.lingering.insert(key, (snapshot, reads));
                    }
                    _ => {}
                }
                Ok(DeleteResponse::OK)
            }
            None => Err(not_found(target)),
        }
    }
}

fn not_found(target: &ResourceRef) -> ArmError {
    ArmError::not_found(
        "Microsoft.Sql/servers",
        format!("{}/{}", target.resource_group, target.name),
    )
}

impl SqlServerOperations for InMemoryControlPlane {
    async fn list(&self) -> Result<Vec<ServerSnapshot>, ArmError> {
        Ok(self.state().servers.values().cloned().collect())
    }

    async fn get(&self, resource_group: &str, name: &str) -> Result<ServerSnapshot, ArmError> {
        let mut guard = self.state();
        let state = &mut *guard;
        let key = key(resource_group, name);

        if let Some(snapshot) = state.servers.get(&key) {
            return Ok(snapshot.clone());
        }
        match state.lingering.remove(&key) {
            Some((snapshot, reads)) if reads > 0 => {
                if reads > 1 {
                    state.lingering.insert(key, (snapshot.clone(), reads - 1));
                }
                Ok(snapshot)
            }
            _ => Err(not_found(&ResourceRef::new(resource_group, name))),
        }
    }

    fn delete(
        &self,
        resource_group: &str,
        name: &str,
        cancel: CancellationToken,
    ) -> DeletionHandle {
        let target = ResourceRef::new(resource_group, name);
        debug!(target = %target, "Delete requested");

        let (tx, handle) = DeletionHandle::channel(cancel.clone());
        let plane = self.clone();
        let latency = self.delete_latency;
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ArmError::Cancelled),
                _ = tokio::time::sleep(latency) => plane.apply_delete(&target),
            };
            tx.finish(result);
        });
        handle
    }

    async fn create_or_update(&self, server: &DeclaredResource) -> Result<ServerSnapshot, ArmError> {
        let mut guard = self.state();
        let state = &mut *guard;
        let key = key(&server.resource_group, &server.name);

        if let Some(existing) = state.servers.get(&key) {
            if existing.location != server.location {
                return Err(ArmError::Conflict {
                    message: format!(
                        "server {} is in {}, cannot move to {}",
                        server.name, existing.location, server.location
                    ),
                });
            }
        }

        let snapshot = ServerSnapshot {
            id: self.server_id(&server.resource_group, &server.name),
            name: server.name.clone(),
            location: server.location.clone(),
            tags: server.tags.clone(),
            properties: ServerProperties {
                version: Some(server.version.clone()),
                administrator_login: Some(server.administrator_login.clone()),
                fully_qualified_domain_name: Some(format!("{}.database.windows.net", server.name)),
                state: Some("Ready".to_string()),
            },
        };
        state.servers.insert(key, snapshot.clone());
        Ok(snapshot)
    }
}
