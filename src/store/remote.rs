// src/store/remote.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("falha de transporte: {0}")]
    Transport(String),

    #[error("resposta inesperada do armazém remoto: {0}")]
    BadResponse(String),
}

// A fronteira com o armazém autoritativo. O motor nunca bloqueia nessas
// chamadas: tudo passa pelo outbox (escrita) ou pelo seed/reconciliador
// (leitura em massa). A implementação do armazém em si fica fora do escopo.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn create(&self, collection: &str, id: Uuid, doc: &Value) -> Result<(), RemoteError>;
    async fn update(&self, collection: &str, id: Uuid, patch: &Value) -> Result<(), RemoteError>;
    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), RemoteError>;
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Value>, RemoteError>;
}

// =========================================================================
//  ARMAZÉM EM MEMÓRIA (modo dev e testes)
// =========================================================================

// Usado quando REMOTE_STORE_URL não está definida. Também serve aos testes,
// com injeção de falha para exercitar o caminho de retry do outbox.
#[derive(Default)]
pub struct InMemoryRemote {
    collections: RwLock<HashMap<String, HashMap<Uuid, Value>>>,
    fail_next: AtomicU32,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// As próximas `n` escritas falham com erro de transporte.
    pub fn fail_next_writes(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Leitura direta de um documento, para asserções em teste.
    pub fn doc(&self, collection: &str, id: Uuid) -> Option<Value> {
        self.collections
            .read()
            .expect("remote poisoned")
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .cloned()
    }

    fn check_failure(&self) -> Result<(), RemoteError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(RemoteError::Transport("falha injetada".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn create(&self, collection: &str, id: Uuid, doc: &Value) -> Result<(), RemoteError> {
        self.check_failure()?;
        let mut collections = self.collections.write().expect("remote poisoned");
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, doc.clone());
        Ok(())
    }

    async fn update(&self, collection: &str, id: Uuid, patch: &Value) -> Result<(), RemoteError> {
        self.check_failure()?;
        let mut collections = self.collections.write().expect("remote poisoned");
        let docs = collections.entry(collection.to_string()).or_default();
        // Última escrita vence; patch desconhecido é ignorado (idempotente)
        if let Some(doc) = docs.get_mut(&id) {
            if let (Some(target), Some(changes)) = (doc.as_object_mut(), patch.as_object()) {
                for (key, value) in changes {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), RemoteError> {
        self.check_failure()?;
        let mut collections = self.collections.write().expect("remote poisoned");
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(&id);
        }
        Ok(())
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Value>, RemoteError> {
        let collections = self.collections.read().expect("remote poisoned");
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}
