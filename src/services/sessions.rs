use crate::core::MembershipSession;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Handle to one open membership session
pub type SharedSession = Arc<Mutex<MembershipSession>>;

/// Open "manage membership" sessions, keyed by a random id
///
/// Sessions expire after `idle_ttl` without access. A save only holds the
/// session lock while it flips state, so a concurrent save observes the
/// Saving state and is rejected rather than queued.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: moka::future::Cache<Uuid, SharedSession>,
}

impl SessionRegistry {
    pub fn new(max_sessions: u64, idle_ttl: Duration) -> Self {
        let sessions = moka::future::CacheBuilder::new(max_sessions)
            .time_to_idle(idle_ttl)
            .build();
        Self { sessions }
    }

    pub async fn open(&self, session: MembershipSession) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.insert(id, shared.clone()).await;
        tracing::debug!("Registered membership session {}", id);
        (id, shared)
    }

    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.get(id).await
    }

    pub async fn remove(&self, id: &Uuid) {
        self.sessions.invalidate(id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{normalize_all, RecordId};

    #[tokio::test]
    async fn test_open_get_remove() {
        let registry = SessionRegistry::new(10, Duration::from_secs(60));
        let session = MembershipSession::from_baseline(RecordId::Int(1), normalize_all([1]));

        let (id, _) = registry.open(session).await;
        let shared = registry.get(&id).await.expect("session registered");
        assert_eq!(shared.lock().await.baseline().len(), 1);

        registry.remove(&id).await;
        assert!(registry.get(&id).await.is_none());
    }
}
