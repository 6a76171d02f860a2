//! Measurement store access: raw document lookup, decoding, and the
//! per-scrape adapter that turns a time window into [`AllData`].

pub mod decode;
pub mod memory;
pub mod redis_store;
pub mod source;
pub mod types;

use async_trait::async_trait;

use crate::error::StoreError;

pub use decode::{decode_probe_group, DecodeIssue, DecodeOutcome};
pub use memory::MemoryDocumentStore;
pub use redis_store::RedisDocumentStore;
pub use source::ProbeSource;
pub use types::{AllData, CommandResult, Measurement, ProbeGroup, QueryWindow};

/// Point-query access to raw probe documents.
///
/// Implementations must be safe to call from concurrent scrapes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Verify the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// The first document for `origin` whose client timestamp lies in
    /// `window`, ordered by client timestamp ascending.
    async fn first_in_window(
        &self,
        origin: &str,
        window: QueryWindow,
    ) -> Result<Option<String>, StoreError>;
}
