use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::app::ports::RunRepositoryPort;
use crate::error::{DqError, Result};
use crate::types::RunRecord;

/// Run repository for tests and one-shot CLI invocations
#[derive(Clone, Default)]
pub struct InMemoryRunStore {
    runs: Arc<Mutex<HashMap<Uuid, RunRecord>>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_runs<T>(&self, f: impl FnOnce(&mut HashMap<Uuid, RunRecord>) -> T) -> Result<T> {
        let mut runs = self
            .runs
            .lock()
            .map_err(|_| DqError::Task("run store lock poisoned".to_string()))?;
        Ok(f(&mut runs))
    }
}

#[async_trait]
impl RunRepositoryPort for InMemoryRunStore {
    async fn save(&self, run: &RunRecord) -> Result<()> {
        self.with_runs(|runs| {
            runs.insert(run.id, run.clone());
        })
    }

    async fn get(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        self.with_runs(|runs| runs.get(&run_id).cloned())
    }

    async fn next_run_number(&self, project: &str) -> Result<u32> {
        self.with_runs(|runs| {
            runs.values()
                .filter(|r| r.project == project)
                .map(|r| r.run_number)
                .max()
                .unwrap_or(0)
                + 1
        })
    }

    async fn list_by_project(&self, project: &str) -> Result<Vec<RunRecord>> {
        self.with_runs(|runs| {
            let mut list: Vec<RunRecord> = runs.values().filter(|r| r.project == project).cloned().collect();
            list.sort_by_key(|r| r.run_number);
            list
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::report::Report;
    use crate::types::{RunMode, RunStatus};
    use chrono::Utc;

    pub(crate) fn sample_run(project: &str, run_number: u32) -> RunRecord {
        RunRecord {
            id: Uuid::new_v4(),
            project: project.to_string(),
            run_number,
            file_name: format!("{}-{}.csv", project, run_number),
            file_size: 42,
            row_count: 2,
            column_count: 2,
            columns: vec!["name".into(), "email".into()],
            quality_score: 75.0,
            total_issues: 1,
            total_fixes: 0,
            issue_breakdown: Default::default(),
            total_changes: 0,
            auto_accepted_count: 0,
            needs_review_count: 0,
            manual_overrides: 0,
            mode: RunMode::Auto,
            status: RunStatus::Completed,
            original_ref: "cas:sha256:00".into(),
            cleaned_ref: None,
            changelog_ref: None,
            report: Report::default(),
            verification_stats: Default::default(),
            created_at: Utc::now(),
            completed_at: None,
            run_by: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn lists_in_run_number_order() {
        let store = InMemoryRunStore::new();
        store.save(&sample_run("acme", 2)).await.unwrap();
        store.save(&sample_run("acme", 1)).await.unwrap();
        store.save(&sample_run("other", 7)).await.unwrap();

        let numbers: Vec<u32> = store
            .list_by_project("acme")
            .await
            .unwrap()
            .iter()
            .map(|r| r.run_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(store.next_run_number("acme").await.unwrap(), 3);
        assert_eq!(store.next_run_number("new").await.unwrap(), 1);
    }
}
