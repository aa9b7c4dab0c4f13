// src/store/entity_store.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::{Activity, Brand, Client, MonthlyTarget, Representative};
use super::outbox::{Outbox, Reconcile, WriteOp};
use super::remote::{RemoteError, RemoteStore};

// O que uma entidade precisa oferecer para viver no cache.
pub trait StoreEntity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const COLLECTION: &'static str;
    fn id(&self) -> Uuid;
}

// Uma página de resultados. O `seq` é o número de sequência da requisição:
// respostas com `seq` menor que o último despachado estão velhas e devem
// ser descartadas pelo chamador (navegação rápida entre páginas).
#[derive(Debug, Clone)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub seq: u64,
}

// =========================================================================
//  O CACHE OTIMISTA (write-behind)
// =========================================================================

// Leituras sempre refletem a última mutação local; a persistência remota
// acontece depois, pelo outbox, sem bloquear e sem rollback em caso de
// falha (ver store::outbox para o caminho de reconciliação).
#[derive(Clone)]
pub struct EntityStore<T: StoreEntity> {
    cache: Arc<RwLock<HashMap<Uuid, T>>>,
    outbox: Outbox,
    remote: Arc<dyn RemoteStore>,
    list_seq: Arc<AtomicU64>,
    command_lock: Arc<tokio::sync::Mutex<()>>,
}

impl<T: StoreEntity> EntityStore<T> {
    pub fn new(remote: Arc<dyn RemoteStore>, outbox: Outbox) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            outbox,
            remote,
            list_seq: Arc::new(AtomicU64::new(0)),
            command_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Carga inicial (e recarga do reconciliador): substitui o cache pelo
    /// conteúdo remoto. Documentos que não desserializam são ignorados.
    pub async fn seed(&self) -> Result<usize, RemoteError> {
        let docs = self.remote.fetch_all(T::COLLECTION).await?;
        let mut entities = Vec::with_capacity(docs.len());
        for doc in docs {
            match serde_json::from_value::<T>(doc) {
                Ok(entity) => entities.push(entity),
                Err(err) => {
                    tracing::warn!(collection = T::COLLECTION, "seed: documento ignorado: {err}");
                }
            }
        }

        let count = entities.len();
        let mut cache = self.cache.write().expect("cache poisoned");
        cache.clear();
        for entity in entities {
            cache.insert(entity.id(), entity);
        }
        Ok(count)
    }

    pub fn get(&self, id: Uuid) -> Option<T> {
        self.cache.read().expect("cache poisoned").get(&id).cloned()
    }

    /// Cópia de todos os itens, para as projeções puras dos services.
    pub fn snapshot(&self) -> Vec<T> {
        self.cache.read().expect("cache poisoned").values().cloned().collect()
    }

    /// Insere no cache imediatamente e agenda a persistência. O retorno
    /// NÃO espera confirmação remota.
    pub fn create(&self, entity: T) -> Result<T, AppError> {
        let doc = serde_json::to_value(&entity).map_err(anyhow::Error::from)?;
        self.cache
            .write()
            .expect("cache poisoned")
            .insert(entity.id(), entity.clone());
        self.outbox.enqueue(WriteOp::Create { collection: T::COLLECTION, id: entity.id(), doc });
        Ok(entity)
    }

    /// Merge de um patch (objeto JSON) na entidade em cache. Chave com
    /// `null` limpa o campo; chave ausente não toca nele. Só os campos
    /// alterados seguem para o remoto. Id desconhecido = no-op com sucesso.
    pub fn update(&self, id: Uuid, patch: Value) -> Result<Option<T>, AppError> {
        let Value::Object(changes) = patch else {
            return Err(AppError::field("patch", "esperado um objeto JSON"));
        };
        if changes.is_empty() {
            // update(id, {}) não muda nada e não gera escrita remota
            return Ok(self.get(id));
        }

        let mut cache = self.cache.write().expect("cache poisoned");
        let Some(current) = cache.get(&id) else {
            return Ok(None);
        };

        let mut doc = serde_json::to_value(current).map_err(anyhow::Error::from)?;
        let target = doc
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("entidade não serializa como objeto"))
            .map_err(AppError::from)?;
        for (key, value) in &changes {
            target.insert(key.clone(), value.clone());
        }

        let updated: T = serde_json::from_value(doc)
            .map_err(|e| AppError::field("patch", format!("valor incompatível: {e}")))?;
        cache.insert(id, updated.clone());
        drop(cache);

        self.outbox.enqueue(WriteOp::Update {
            collection: T::COLLECTION,
            id,
            patch: Value::Object(changes),
        });
        Ok(Some(updated))
    }

    /// Remove do cache imediatamente. Id desconhecido = no-op com sucesso.
    pub fn delete(&self, id: Uuid) {
        let removed = self.cache.write().expect("cache poisoned").remove(&id);
        if removed.is_some() {
            self.outbox.enqueue(WriteOp::Delete { collection: T::COLLECTION, id });
        }
    }

    /// Listagem filtrada e paginada (página 1-based), com ordem estável
    /// por id e número de sequência para descarte de respostas velhas.
    pub fn list<F>(&self, filter: F, page: usize, page_size: usize) -> PageResult<T>
    where
        F: Fn(&T) -> bool,
    {
        let seq = self.list_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let cache = self.cache.read().expect("cache poisoned");
        let mut items: Vec<T> = cache.values().filter(|t| filter(t)).cloned().collect();
        drop(cache);
        items.sort_by_key(|t| t.id());

        let total_count = items.len();
        let page = page.max(1);
        let page_size = page_size.max(1);
        let start = (page - 1) * page_size;
        let items = if start >= items.len() {
            Vec::new()
        } else {
            let end = (start + page_size).min(items.len());
            items[start..end].to_vec()
        };

        PageResult { items, total_count, seq }
    }

    pub fn latest_seq(&self) -> u64 {
        self.list_seq.load(Ordering::SeqCst)
    }

    /// Uma resposta é velha se uma listagem mais nova já foi despachada.
    pub fn is_stale(&self, seq: u64) -> bool {
        seq < self.latest_seq()
    }

    /// Guarda de comando único para lotes de atribuição: enquanto o guard
    /// vive, nenhum outro comando de atribuição entra na mesma coleção.
    pub async fn lock_commands(&self) -> tokio::sync::OwnedMutexGuard<()> {
        self.command_lock.clone().lock_owned().await
    }
}

#[async_trait]
impl<T: StoreEntity> Reconcile for EntityStore<T> {
    async fn reconcile(&self) -> Result<(), RemoteError> {
        let count = self.seed().await?;
        tracing::debug!(collection = T::COLLECTION, count, "reconciliador: cache recarregado");
        Ok(())
    }
}

// --- Vínculo das entidades com suas coleções ---

impl StoreEntity for Client {
    const COLLECTION: &'static str = "clients";
    fn id(&self) -> Uuid {
        self.id
    }
}

impl StoreEntity for Representative {
    const COLLECTION: &'static str = "team";
    fn id(&self) -> Uuid {
        self.id
    }
}

impl StoreEntity for Activity {
    const COLLECTION: &'static str = "activities";
    fn id(&self) -> Uuid {
        self.id
    }
}

impl StoreEntity for MonthlyTarget {
    const COLLECTION: &'static str = "targets";
    fn id(&self) -> Uuid {
        self.id
    }
}

impl StoreEntity for Brand {
    const COLLECTION: &'static str = "brands";
    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::notify::Notifier;
    use crate::models::LeadStatus;
    use crate::store::outbox::RetryPolicy;
    use crate::store::remote::InMemoryRemote;
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;

    fn sample_client(name: &str) -> Client {
        Client {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: Some("+9647701234567".into()),
            email: Some("lead@example.com".into()),
            address: None,
            instagram: None,
            maps_link: None,
            status: LeadStatus::New,
            assigned_to: None,
            province: "Baghdad".into(),
            product_interest: None,
            deal_value: None,
            last_interaction_at: None,
            follow_up_at: None,
            follow_up_note: None,
            loss_reason: None,
            loss_note: None,
            created_at: Utc::now(),
        }
    }

    fn store_with_remote() -> (EntityStore<Client>, Arc<InMemoryRemote>, Notifier, Outbox) {
        let remote = Arc::new(InMemoryRemote::new());
        let notifier = Notifier::new(8);
        let policy = RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1) };
        let outbox = Outbox::spawn(remote.clone(), notifier.clone(), policy);
        let store = EntityStore::new(remote.clone(), outbox.clone());
        (store, remote, notifier, outbox)
    }

    async fn drain(outbox: &Outbox) {
        for _ in 0..200 {
            if outbox.is_idle() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("outbox não esvaziou a tempo");
    }

    #[tokio::test]
    async fn create_e_list_fazem_round_trip_completo() {
        let (store, _, _, outbox) = store_with_remote();
        let client = sample_client("Round Trip");
        let created = store.create(client.clone()).unwrap();
        assert_eq!(created.id, client.id);

        let page = store.list(|c| c.id == client.id, 1, 25);
        assert_eq!(page.total_count, 1);
        let listed = &page.items[0];
        assert_eq!(listed.name, client.name);
        assert_eq!(listed.phone, client.phone);
        assert_eq!(listed.email, client.email);
        assert_eq!(listed.province, client.province);
        assert_eq!(listed.status, client.status);
        assert_eq!(listed.created_at, client.created_at);
        drain(&outbox).await;
    }

    #[tokio::test]
    async fn update_vazio_e_idempotente() {
        let (store, remote, _, outbox) = store_with_remote();
        let client = store.create(sample_client("Sem Mudança")).unwrap();

        let after = store.update(client.id, json!({})).unwrap().unwrap();
        assert_eq!(serde_json::to_value(&after).unwrap(), serde_json::to_value(&client).unwrap());

        drain(&outbox).await;
        // Só o create chegou ao remoto; o patch vazio não gerou escrita
        let doc = remote.doc("clients", client.id).unwrap();
        assert_eq!(doc, serde_json::to_value(&client).unwrap());
    }

    #[tokio::test]
    async fn patch_com_null_limpa_o_campo() {
        let (store, _, _, _) = store_with_remote();
        let client = store.create(sample_client("Limpeza")).unwrap();

        let after = store
            .update(client.id, json!({ "phone": null, "followUpNote": "ligar sexta" }))
            .unwrap()
            .unwrap();
        assert_eq!(after.phone, None);
        assert_eq!(after.follow_up_note.as_deref(), Some("ligar sexta"));
    }

    #[tokio::test]
    async fn update_e_delete_de_id_desconhecido_sao_no_ops() {
        let (store, _, _, _) = store_with_remote();
        let missing = Uuid::new_v4();

        assert!(store.update(missing, json!({"name": "x"})).unwrap().is_none());
        store.delete(missing); // não entra em pânico nem enfileira nada
    }

    #[tokio::test]
    async fn falha_remota_nao_desfaz_a_mutacao_local() {
        let (store, remote, notifier, outbox) = store_with_remote();
        remote.fail_next_writes(10);

        let client = store.create(sample_client("Otimista")).unwrap();
        drain(&outbox).await;

        // Local segue valendo; remoto nunca recebeu; aviso publicado
        assert!(store.get(client.id).is_some());
        assert!(remote.doc("clients", client.id).is_none());
        assert_eq!(notifier.recent().len(), 1);
    }

    #[tokio::test]
    async fn escritas_confirmadas_chegam_ao_remoto() {
        let (store, remote, _, outbox) = store_with_remote();
        let client = store.create(sample_client("Persistido")).unwrap();
        store.update(client.id, json!({"name": "Persistido v2"})).unwrap();
        drain(&outbox).await;

        let doc = remote.doc("clients", client.id).unwrap();
        assert_eq!(doc["name"], "Persistido v2");

        store.delete(client.id);
        drain(&outbox).await;
        assert!(remote.doc("clients", client.id).is_none());
    }

    #[tokio::test]
    async fn sequencia_detecta_resposta_velha() {
        let (store, _, _, _) = store_with_remote();
        store.create(sample_client("A")).unwrap();

        let first = store.list(|_| true, 1, 25);
        let second = store.list(|_| true, 1, 25);

        assert!(second.seq > first.seq);
        assert!(store.is_stale(first.seq));
        assert!(!store.is_stale(second.seq));
    }

    #[tokio::test]
    async fn paginacao_informa_o_total() {
        let (store, _, _, _) = store_with_remote();
        for i in 0..5 {
            store.create(sample_client(&format!("Lead {i}"))).unwrap();
        }

        let page = store.list(|_| true, 1, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, 5);

        let last = store.list(|_| true, 3, 2);
        assert_eq!(last.items.len(), 1);

        let beyond = store.list(|_| true, 9, 2);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_count, 5);
    }

    #[tokio::test]
    async fn seed_substitui_o_cache() {
        let (store, remote, _, outbox) = store_with_remote();
        let client = store.create(sample_client("No Remoto")).unwrap();
        drain(&outbox).await;

        // Simula divergência local e recarrega
        store.delete_local_for_test(client.id);
        assert!(store.get(client.id).is_none());

        let count = store.seed().await.unwrap();
        assert_eq!(count, 1);
        assert!(store.get(client.id).is_some());
    }
}

#[cfg(test)]
impl<T: StoreEntity> EntityStore<T> {
    /// Remove só do cache, sem agendar escrita: simula divergência.
    fn delete_local_for_test(&self, id: Uuid) {
        self.cache.write().expect("cache poisoned").remove(&id);
    }
}
