use std::fmt;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    InProgress,
    Success,
    Failure,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::InProgress => "in_progress",
            JobStatus::Success => "success",
            JobStatus::Failure => "failure",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages of an organization delete
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStage {
    Pending,
    Enumerating,
    ChunkDeleting,
    Finalizing,
    Done,
    Failed,
}

impl DeleteStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteStage::Pending => "pending",
            DeleteStage::Enumerating => "enumerating",
            DeleteStage::ChunkDeleting => "chunk_deleting",
            DeleteStage::Finalizing => "finalizing",
            DeleteStage::Done => "done",
            DeleteStage::Failed => "failed",
        }
    }
}

impl fmt::Display for DeleteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload stored under a progress key
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub status: JobStatus,
    /// 0 to 100
    pub progress: f64,
    pub progress_key: String,
    pub stage: DeleteStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressRecord {
    pub fn new(progress_key: impl Into<String>, stage: DeleteStage) -> Self {
        Self {
            status: JobStatus::InProgress,
            progress: 0.0,
            progress_key: progress_key.into(),
            stage,
            message: None,
        }
    }

    pub fn with_stage(mut self, stage: DeleteStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn succeeded(mut self) -> Self {
        self.status = JobStatus::Success;
        self.stage = DeleteStage::Done;
        self.progress = 100.0;
        self
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = JobStatus::Failure;
        self.stage = DeleteStage::Failed;
        self.message = Some(message.into());
        self
    }
}

/// Shared key/value store background jobs report progress through.
///
/// `set` is last-write-wins. `increment` must be atomic with respect to
/// concurrent increments on the same key.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn set(&self, key: &str, record: ProgressRecord) -> anyhow::Result<()>;

    async fn increment(&self, key: &str, amount: f64) -> anyhow::Result<ProgressRecord>;

    async fn get(&self, key: &str) -> anyhow::Result<Option<ProgressRecord>>;
}

/// Process-local progress store
#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    records: DashMap<String, ProgressRecord>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn set(&self, key: &str, record: ProgressRecord) -> anyhow::Result<()> {
        self.records.insert(key.to_string(), record);
        Ok(())
    }

    async fn increment(&self, key: &str, amount: f64) -> anyhow::Result<ProgressRecord> {
        // entry() holds the shard lock across the read-modify-write
        let record = self
            .records
            .entry(key.to_string())
            .and_modify(|record| record.progress += amount)
            .or_insert_with(|| {
                let mut record = ProgressRecord::new(key, DeleteStage::ChunkDeleting);
                record.progress = amount;
                record
            });
        Ok(record.value().clone())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<ProgressRecord>> {
        Ok(self.records.get(key).map(|record| record.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryProgressStore::new());
        store
            .set("org-delete:1", ProgressRecord::new("org-delete:1", DeleteStage::ChunkDeleting))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment("org-delete:1", 2.0).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = store.get("org-delete:1").await.unwrap().unwrap();
        assert!((record.progress - 100.0).abs() < f64::EPSILON);
        assert_eq!(record.status, JobStatus::InProgress);
    }

    #[tokio::test]
    async fn test_set_is_last_write_wins() {
        let store = InMemoryProgressStore::new();
        let key = "org-delete:2";
        store
            .set(key, ProgressRecord::new(key, DeleteStage::Enumerating))
            .await
            .unwrap();
        store
            .set(key, ProgressRecord::new(key, DeleteStage::Finalizing).succeeded())
            .await
            .unwrap();

        let record = store.get(key).await.unwrap().unwrap();
        assert_eq!(record.stage, DeleteStage::Done);
        assert_eq!(record.progress, 100.0);
        assert!(record.status.is_terminal());
        assert!(store.get("org-delete:3").await.unwrap().is_none());
    }

    #[test]
    fn test_record_serializes_with_snake_case_status() {
        let record = ProgressRecord::new("org-delete:9", DeleteStage::ChunkDeleting)
            .failed("1 chunk failed");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["stage"], "failed");
        assert_eq!(json["progress_key"], "org-delete:9");
        assert_eq!(json["message"], "1 chunk failed");
    }
}
