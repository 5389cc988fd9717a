//! Connected stream clients: client id -> outbound message queue.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

/// Outbound queue depth per client.
const QUEUE_DEPTH: usize = 32;

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, mpsc::Sender<String>>>,
}

impl SessionRegistry {
    /// Registers a fresh client; the entry lives as long as the guard.
    pub fn register(&self) -> (SessionGuard, mpsc::Receiver<String>) {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        self.sessions.insert(id.clone(), tx);
        tracing::debug!(client_id = %id, "stream client registered");
        (
            SessionGuard {
                id,
                registry: self.clone(),
            },
            rx,
        )
    }

    /// Sender for `client_id`, if that client is still connected.
    pub fn sender(&self, client_id: &str) -> Option<mpsc::Sender<String>> {
        self.sessions.get(client_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.sessions.contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn remove(&self, client_id: &str) {
        if self.sessions.remove(client_id).is_some() {
            tracing::debug!(client_id = %client_id, "stream client removed");
        }
    }
}

/// Removes its registry entry when dropped.
pub struct SessionGuard {
    id: String,
    registry: SessionRegistry,
}

impl SessionGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}
