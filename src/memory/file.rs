//! Durable thread store: one JSON file per thread.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::ThreadStore;
use crate::error::{EngineError, Result};
use crate::types::{Message, Transcript};

#[derive(Serialize, Deserialize)]
struct ThreadFile {
    thread_id: String,
    updated_at: DateTime<Utc>,
    messages: Vec<Message>,
}

/// Stores `<dir>/<thread_id>.json`, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileThreadStore {
    base_path: PathBuf,
}

impl FileThreadStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn thread_path(&self, thread_id: &str) -> Result<PathBuf> {
        validate_thread_id(thread_id)?;
        Ok(self.base_path.join(format!("{thread_id}.json")))
    }
}

/// Reject ids that are unsafe as file names.
fn validate_thread_id(thread_id: &str) -> Result<()> {
    if thread_id.is_empty() {
        return Err(EngineError::InvalidInput(
            "thread id cannot be empty".to_string(),
        ));
    }
    if thread_id.contains('/')
        || thread_id.contains('\\')
        || thread_id.contains("..")
        || thread_id.starts_with('.')
        || thread_id.chars().any(|c| c.is_control())
    {
        return Err(EngineError::InvalidInput(format!(
            "thread id is not usable as a file name: {thread_id:?}"
        )));
    }
    Ok(())
}

#[async_trait]
impl ThreadStore for FileThreadStore {
    async fn load(&self, thread_id: &str) -> Result<Transcript> {
        let path = self.thread_path(thread_id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Transcript::new()),
            Err(e) => return Err(e.into()),
        };
        let file: ThreadFile = serde_json::from_str(&content)?;
        if file.thread_id != thread_id {
            return Err(EngineError::Storage(format!(
                "{} holds thread '{}'",
                path.display(),
                file.thread_id
            )));
        }
        Ok(Transcript::from(file.messages))
    }

    async fn save(&self, thread_id: &str, transcript: &Transcript) -> Result<()> {
        let path = self.thread_path(thread_id)?;
        tokio::fs::create_dir_all(&self.base_path).await?;

        let content = serde_json::to_string_pretty(&ThreadFile {
            thread_id: thread_id.to_string(),
            updated_at: Utc::now(),
            messages: transcript.messages().to_vec(),
        })?;

        let tmp_path = self.base_path.join(format!(
            ".{thread_id}.{}.tmp",
            uuid::Uuid::new_v4().simple()
        ));

        let write_result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, &path).await
        }
        .await;

        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(EngineError::Storage(format!(
                "failed to write {}: {e}",
                path.display()
            )));
        }

        debug!(thread_id, messages = transcript.len(), "thread checkpoint written");
        Ok(())
    }

    async fn clear(&self, thread_id: &str) -> Result<()> {
        let path = self.thread_path(thread_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear_all(&self) -> Result<()> {
        let mut entries = match tokio::fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}
