// src/store/outbox.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::common::notify::{Notifier, SyncNotice};
use super::remote::{RemoteError, RemoteStore};

// =========================================================================
//  FILA DE ESCRITA (write-behind)
// =========================================================================

// Uma escrita pendente contra o armazém remoto. A mutação local já
// aconteceu quando a operação entra na fila.
#[derive(Debug)]
pub enum WriteOp {
    Create { collection: &'static str, id: Uuid, doc: Value },
    Update { collection: &'static str, id: Uuid, patch: Value },
    Delete { collection: &'static str, id: Uuid },
}

impl WriteOp {
    fn entity_id(&self) -> Uuid {
        match self {
            WriteOp::Create { id, .. } | WriteOp::Update { id, .. } | WriteOp::Delete { id, .. } => *id,
        }
    }

    fn collection(&self) -> &'static str {
        match self {
            WriteOp::Create { collection, .. }
            | WriteOp::Update { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            WriteOp::Create { .. } => "create",
            WriteOp::Update { .. } => "update",
            WriteOp::Delete { .. } => "delete",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Backoff exponencial: base * 2^(tentativa - 1).
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(500) }
    }
}

// O outbox compartilhado por todas as coleções: um único worker drena a
// fila em ordem, preservando a sequência global das escritas.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<WriteOp>,
    pending: Arc<AtomicUsize>,
}

impl Outbox {
    pub fn spawn(remote: Arc<dyn RemoteStore>, notifier: Notifier, policy: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        tokio::spawn(worker(rx, remote, notifier, policy, pending.clone()));
        Self { tx, pending }
    }

    /// Enfileira sem bloquear. O chamador já aplicou a mutação local e
    /// não espera confirmação remota.
    pub fn enqueue(&self, op: WriteOp) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(op).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::error!("outbox: worker encerrado, escrita descartada");
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }
}

async fn worker(
    mut rx: mpsc::UnboundedReceiver<WriteOp>,
    remote: Arc<dyn RemoteStore>,
    notifier: Notifier,
    policy: RetryPolicy,
    pending: Arc<AtomicUsize>,
) {
    while let Some(op) = rx.recv().await {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match dispatch(remote.as_ref(), &op).await {
                Ok(()) => {
                    tracing::debug!(
                        collection = op.collection(),
                        kind = op.kind(),
                        entity_id = %op.entity_id(),
                        "outbox: escrita confirmada"
                    );
                    break;
                }
                Err(err) if attempt < policy.max_attempts => {
                    tracing::warn!(
                        collection = op.collection(),
                        entity_id = %op.entity_id(),
                        attempt,
                        "outbox: falha, tentando de novo: {err}"
                    );
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
                Err(err) => {
                    // Esgotou: o estado local fica como está (sem rollback)
                    // e a UI é avisada de forma não-bloqueante.
                    tracing::error!(
                        collection = op.collection(),
                        kind = op.kind(),
                        entity_id = %op.entity_id(),
                        attempts = attempt,
                        "outbox: escrita abandonada: {err}"
                    );
                    notifier.publish(SyncNotice {
                        entity_id: op.entity_id(),
                        collection: op.collection().to_string(),
                        attempts: attempt,
                        message: err.to_string(),
                        at: Utc::now(),
                    });
                    break;
                }
            }
        }
        pending.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn dispatch(remote: &dyn RemoteStore, op: &WriteOp) -> Result<(), RemoteError> {
    match op {
        WriteOp::Create { collection, id, doc } => remote.create(collection, *id, doc).await,
        WriteOp::Update { collection, id, patch } => remote.update(collection, *id, patch).await,
        WriteOp::Delete { collection, id } => remote.delete(collection, *id).await,
    }
}

// =========================================================================
//  RECONCILIADOR
// =========================================================================

// Recarga periódica a partir do remoto: o único caminho de reconciliação
// depois de uma escrita abandonada.
#[async_trait]
pub trait Reconcile: Send + Sync {
    async fn reconcile(&self) -> Result<(), RemoteError>;
}

/// Dispara a recarga de cada coleção em intervalos fixos, mas só quando o
/// outbox está ocioso: recarregar com escritas pendentes desfaria mutações
/// locais ainda não persistidas.
pub fn spawn_reconciler(stores: Vec<Arc<dyn Reconcile>>, outbox: Outbox, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // O primeiro tick resolve na hora; o seed inicial já cobriu esse caso
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if !outbox.is_idle() {
                tracing::debug!(pending = outbox.pending(), "reconciliador: outbox ocupado, pulando ciclo");
                continue;
            }
            for store in &stores {
                if let Err(err) = store.reconcile().await {
                    tracing::warn!("reconciliador: recarga falhou: {err}");
                }
            }
        }
    });
}
