//! Volatile thread store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ThreadStore;
use crate::error::Result;
use crate::types::Transcript;

/// Process-local store; every thread is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryThreadStore {
    threads: RwLock<HashMap<String, Transcript>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads with a checkpoint.
    pub async fn len(&self) -> usize {
        self.threads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.threads.read().await.is_empty()
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn load(&self, thread_id: &str) -> Result<Transcript> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, thread_id: &str, transcript: &Transcript) -> Result<()> {
        self.threads
            .write()
            .await
            .insert(thread_id.to_string(), transcript.clone());
        Ok(())
    }

    async fn clear(&self, thread_id: &str) -> Result<()> {
        self.threads.write().await.remove(thread_id);
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.threads.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[tokio::test]
    async fn unseen_thread_loads_empty() {
        let store = InMemoryThreadStore::new();
        assert!(store.load("never").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_overwrites_and_clear_removes() {
        let store = InMemoryThreadStore::new();
        store
            .save("t1", &Transcript::from(vec![Message::user("one")]))
            .await
            .unwrap();
        store
            .save("t1", &Transcript::from(vec![Message::user("two")]))
            .await
            .unwrap();

        let loaded = store.load("t1").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.messages()[0].content, "two");

        store.clear("t1").await.unwrap();
        store.clear("t1").await.unwrap();
        assert!(store.load("t1").await.unwrap().is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn clear_all_drops_every_thread() {
        let store = InMemoryThreadStore::new();
        for id in ["a", "b", "c"] {
            store
                .save(id, &Transcript::from(vec![Message::user(id)]))
                .await
                .unwrap();
        }
        assert_eq!(store.len().await, 3);

        store.clear_all().await.unwrap();
        assert!(store.is_empty().await);
    }
}
