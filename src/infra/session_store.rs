use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::app::ports::{PendingReview, SessionStorePort};
use crate::error::{DqError, Result};

/// Process-local review sessions. Expired entries are dropped lazily on
/// the next access.
#[derive(Clone)]
pub struct InMemorySessionStore {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<Uuid, (Instant, PendingReview)>>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, (Instant, PendingReview)>>> {
        self.entries
            .lock()
            .map_err(|_| DqError::Task("session store lock poisoned".to_string()))
    }

    fn evict_expired(&self, map: &mut HashMap<Uuid, (Instant, PendingReview)>) {
        let ttl = self.ttl;
        let before = map.len();
        map.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        let evicted = before - map.len();
        if evicted > 0 {
            debug!(evicted, "Expired review sessions dropped");
        }
    }
}

#[async_trait]
impl SessionStorePort for InMemorySessionStore {
    async fn put(&self, session_id: Uuid, review: PendingReview) -> Result<()> {
        let mut map = self.lock()?;
        self.evict_expired(&mut map);
        map.insert(session_id, (Instant::now(), review));
        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<PendingReview>> {
        let mut map = self.lock()?;
        self.evict_expired(&mut map);
        Ok(map.get(&session_id).map(|(_, review)| review.clone()))
    }

    async fn delete(&self, session_id: Uuid) -> Result<()> {
        self.lock()?.remove(&session_id);
        Ok(())
    }
}
