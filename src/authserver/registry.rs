//! Registered clients.
//!
//! An in-memory registry keyed by `client_id`, built once from
//! configuration. The registry is external to the secret pipeline: the
//! parser and validator only ever see the secrets of the single client a
//! request claims to be.

use std::collections::HashMap;

use crate::secrets::RegisteredSecret;

/// A machine client allowed to request tokens.
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    /// OAuth2 client identifier.
    pub client_id: String,
    /// Scopes this client may be granted.
    pub scopes: Vec<String>,
    /// Registered secrets; several may coexist during certificate rotation.
    pub secrets: Vec<RegisteredSecret>,
}

/// Lookup table of registered clients.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, RegisteredClient>,
}

impl ClientRegistry {
    /// Build a registry from a list of clients. Later duplicates replace
    /// earlier ones.
    pub fn new(clients: impl IntoIterator<Item = RegisteredClient>) -> Self {
        Self {
            clients: clients
                .into_iter()
                .map(|c| (c.client_id.clone(), c))
                .collect(),
        }
    }

    /// Look up a client by id.
    pub fn get(&self, client_id: &str) -> Option<&RegisteredClient> {
        self.clients.get(client_id)
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// True when no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// All scopes any client may be granted, sorted and deduplicated.
    pub fn known_scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = self
            .clients
            .values()
            .flat_map(|c| c.scopes.iter().cloned())
            .collect();
        scopes.sort();
        scopes.dedup();
        scopes
    }
}
