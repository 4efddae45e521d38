use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Change, RunRecord};

/// State kept between a review-mode pass and the apply call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReview {
    pub run_id: Uuid,
    pub file_name: String,
    pub original_ref: String,
    pub changes: Vec<Change>,
    pub original_data: Vec<Value>,
    pub cleaned_data: Vec<Value>,
    pub columns: Vec<String>,
}

/// Pending reviews keyed by session id. Entries may disappear on their own
/// once they outlive the store's time-to-live.
#[async_trait]
pub trait SessionStorePort: Send + Sync {
    async fn put(&self, session_id: Uuid, review: PendingReview) -> Result<()>;
    async fn get(&self, session_id: Uuid) -> Result<Option<PendingReview>>;
    async fn delete(&self, session_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait RunRepositoryPort: Send + Sync {
    /// Insert or replace by id
    async fn save(&self, run: &RunRecord) -> Result<()>;
    async fn get(&self, run_id: Uuid) -> Result<Option<RunRecord>>;
    /// 1 for a project with no runs yet
    async fn next_run_number(&self, project: &str) -> Result<u32>;
    /// Ordered by run number
    async fn list_by_project(&self, project: &str) -> Result<Vec<RunRecord>>;
}

/// Immutable blob storage addressed by opaque references
#[async_trait]
pub trait ArtifactStorePort: Send + Sync {
    async fn put(&self, bytes: &[u8]) -> Result<String>;
    async fn get(&self, reference: &str) -> Result<Vec<u8>>;
}
