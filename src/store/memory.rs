use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{DocumentStore, QueryWindow};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct StoredDocument {
    origin: String,
    client_utc: i64,
    body: String,
}

/// In-process document store with the same window semantics as Redis.
///
/// Used by tests and by embedders that feed documents directly.
pub struct MemoryDocumentStore {
    docs: RwLock<Vec<StoredDocument>>,
    reachable: AtomicBool,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
            reachable: AtomicBool::new(true),
        }
    }

    pub fn insert(&self, origin: &str, client_utc: i64, body: impl Into<String>) {
        self.docs.write().push(StoredDocument {
            origin: origin.to_owned(),
            client_utc,
            body: body.into(),
        });
    }

    /// Simulate an outage: `ping` and queries fail while false.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store marked unreachable".into()))
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_reachable()
    }

    async fn first_in_window(
        &self,
        origin: &str,
        window: QueryWindow,
    ) -> Result<Option<String>, StoreError> {
        self.check_reachable()?;

        // Lowest timestamp wins; equal scores order by member bytes, as in a sorted set.
        let docs = self.docs.read();
        let first = docs
            .iter()
            .filter(|d| d.origin == origin && window.contains(d.client_utc))
            .min_by(|a, b| (a.client_utc, &a.body).cmp(&(b.client_utc, &b.body)))
            .map(|d| d.body.clone());
        Ok(first)
    }
}
