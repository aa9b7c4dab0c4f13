// src/store/rest_remote.rs

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::remote::{RemoteError, RemoteStore};

// Adaptador REST do armazém hospedado: uma coleção por entidade, documentos
// endereçados por id. Qualquer resposta fora de 2xx vira RemoteError.
pub struct RestRemoteStore {
    http: reqwest::Client,
    base_url: String,
}

impl RestRemoteStore {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn doc_url(&self, collection: &str, id: Uuid) -> String {
        format!("{}/{}/{}", self.base_url, collection, id)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn create(&self, collection: &str, id: Uuid, doc: &Value) -> Result<(), RemoteError> {
        self.http
            .post(self.doc_url(collection, id))
            .json(doc)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(|e| RemoteError::BadResponse(e.to_string()))?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: Uuid, patch: &Value) -> Result<(), RemoteError> {
        self.http
            .patch(self.doc_url(collection, id))
            .json(patch)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(|e| RemoteError::BadResponse(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), RemoteError> {
        self.http
            .delete(self.doc_url(collection, id))
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(|e| RemoteError::BadResponse(e.to_string()))?;
        Ok(())
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Value>, RemoteError> {
        let response = self
            .http
            .get(self.collection_url(collection))
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(|e| RemoteError::BadResponse(e.to_string()))?;

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| RemoteError::BadResponse(e.to_string()))
    }
}
