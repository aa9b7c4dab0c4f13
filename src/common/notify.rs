// src/common/notify.rs

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

// Aviso de falha de sincronização remota. A mutação local JÁ foi aplicada;
// isso aqui é só o relatório não-bloqueante para a camada de UI.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncNotice {
    pub entity_id: Uuid,
    pub collection: String,
    pub attempts: u32,
    pub message: String,
    pub at: DateTime<Utc>,
}

// O "sink" de notificações: um broadcast para assinantes ao vivo e um
// buffer limitado dos avisos recentes para a UI consultar depois.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<SyncNotice>,
    recent: Arc<RwLock<VecDeque<SyncNotice>>>,
    capacity: usize,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            recent: Arc::new(RwLock::new(VecDeque::new())),
            capacity,
        }
    }

    /// Publica um aviso. Nunca falha: sem assinantes, o aviso fica
    /// só no buffer de recentes.
    pub fn publish(&self, notice: SyncNotice) {
        {
            let mut recent = self.recent.write().expect("notify buffer poisoned");
            if recent.len() == self.capacity {
                recent.pop_front();
            }
            recent.push_back(notice.clone());
        }
        let _ = self.tx.send(notice);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncNotice> {
        self.tx.subscribe()
    }

    /// Avisos recentes, do mais antigo para o mais novo.
    pub fn recent(&self) -> Vec<SyncNotice> {
        self.recent
            .read()
            .expect("notify buffer poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(n: u32) -> SyncNotice {
        SyncNotice {
            entity_id: Uuid::new_v4(),
            collection: "clients".into(),
            attempts: n,
            message: "connection refused".into(),
            at: Utc::now(),
        }
    }

    #[test]
    fn buffer_de_recentes_e_limitado() {
        let notifier = Notifier::new(2);
        notifier.publish(notice(1));
        notifier.publish(notice(2));
        notifier.publish(notice(3));

        let recent = notifier.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].attempts, 2);
        assert_eq!(recent[1].attempts, 3);
    }

    #[tokio::test]
    async fn assinante_recebe_o_aviso() {
        let notifier = Notifier::new(8);
        let mut rx = notifier.subscribe();
        notifier.publish(notice(1));

        let received = rx.recv().await.expect("aviso perdido");
        assert_eq!(received.collection, "clients");
    }
}
