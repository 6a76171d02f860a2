use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{DocumentStore, QueryWindow};
use crate::config::StoreConfig;
use crate::error::StoreError;

/// Redis-backed document store.
///
/// Documents live in one sorted set per origin at `{key_prefix}:{origin}`,
/// scored by client timestamp. A single `ConnectionManager` is created on
/// first use and shared by every scrape; clones share the multiplexed TCP
/// connection. A failed health check drops it so the next call reconnects.
pub struct RedisDocumentStore {
    client: redis::Client,
    key_prefix: String,
    op_timeout: Duration,
    conn: Mutex<Option<ConnectionManager>>,
}

impl RedisDocumentStore {
    /// Validate the URL without connecting.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| StoreError::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            key_prefix: config.key_prefix.clone(),
            op_timeout: config.timeout(),
            conn: Mutex::new(None),
        })
    }

    pub fn key_for(&self, origin: &str) -> String {
        format!("{}:{}", self.key_prefix, origin)
    }

    /// Borrow the shared connection, connecting if there is none yet.
    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let cached = self.conn.lock().clone();
        if let Some(conn) = cached {
            return Ok(conn);
        }

        let conn = timeout(self.op_timeout, ConnectionManager::new(self.client.clone()))
            .await
            .map_err(|_| StoreError::Timeout {
                op: "connect",
                elapsed: self.op_timeout,
            })?
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        info!("connected to measurement store");
        // A concurrent scrape may have connected too; last one wins.
        *self.conn.lock() = Some(conn.clone());
        Ok(conn)
    }

    fn discard_connection(&self) {
        if self.conn.lock().take().is_some() {
            warn!("dropping measurement store connection after failed health check");
        }
    }

    /// Append one raw document for `origin` at `client_utc`.
    pub async fn insert(&self, origin: &str, client_utc: i64, document: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let key = self.key_for(origin);
        let _: () = timeout(self.op_timeout, conn.zadd(&key, document, client_utc))
            .await
            .map_err(|_| StoreError::Timeout {
                op: "ZADD",
                elapsed: self.op_timeout,
            })??;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;

        let pong: Result<String, StoreError> =
            match timeout(self.op_timeout, redis::cmd("PING").query_async(&mut conn)).await {
                Ok(reply) => reply.map_err(|e| StoreError::Unavailable(e.to_string())),
                Err(_) => Err(StoreError::Timeout {
                    op: "PING",
                    elapsed: self.op_timeout,
                }),
            };

        match pong {
            Ok(p) if p == "PONG" => Ok(()),
            Ok(p) => {
                self.discard_connection();
                Err(StoreError::Unavailable(format!("unexpected PING reply \"{p}\"")))
            }
            Err(e) => {
                self.discard_connection();
                Err(e)
            }
        }
    }

    async fn first_in_window(
        &self,
        origin: &str,
        window: QueryWindow,
    ) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        let key = self.key_for(origin);

        // Score bounds are inclusive; LIMIT 0 1 keeps the earliest match.
        let docs: Vec<String> = timeout(
            self.op_timeout,
            conn.zrangebyscore_limit(&key, window.start, window.end, 0, 1),
        )
        .await
        .map_err(|_| StoreError::Timeout {
            op: "ZRANGEBYSCORE",
            elapsed: self.op_timeout,
        })??;

        debug!(%key, start = window.start, end = window.end, found = docs.len(), "window query");
        Ok(docs.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_origin() {
        let store = RedisDocumentStore::new(&StoreConfig::default()).unwrap();
        assert_eq!(store.key_for("Hong Kong UBISOFT"), "ccmsensor:mtr:Hong Kong UBISOFT");
    }

    #[test]
    fn rejects_malformed_url() {
        let config = StoreConfig {
            url: "not a url".into(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            RedisDocumentStore::new(&config),
            Err(StoreError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_reported_not_fatal() {
        // Port 1 is never a Redis server.
        let config = StoreConfig {
            url: "redis://127.0.0.1:1/".into(),
            timeout_ms: 500,
            ..StoreConfig::default()
        };
        let store = RedisDocumentStore::new(&config).unwrap();
        let err = store.ping().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unavailable(_) | StoreError::Timeout { .. }
        ));
    }
}
