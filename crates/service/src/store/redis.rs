use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tokio::sync::Mutex;

use models::user::{self, UserRecord};

use crate::errors::StoreError;
use crate::store::{io_timeout, UserStore};

/// Redis-backed user store.
///
/// One key per user (`user:<email>`), value is the JSON-serialized record.
/// Connections come from a deadpool pool: established lazily on first use,
/// reused across calls, re-established by the pool after drops. Per-key
/// granularity means operations on different emails never interfere.
///
/// Uniqueness under concurrency: `add_user` writes with `SETNX`, so the
/// existence check and the write are a single step on the medium.
/// `update_user` is a read-modify-write; it is serialized per email through
/// an in-process lock map.
pub struct RedisUserStore {
    pool: Pool,
    locks: DashMap<String, Arc<Mutex<()>>>,
    op_timeout: Duration,
}

impl RedisUserStore {
    /// Build the pool from a connection URL. No round-trip happens here; the
    /// first operation opens the first connection.
    pub fn connect(url: &str, op_timeout: Duration) -> Result<Arc<Self>, StoreError> {
        let cfg = PoolConfig::from_url(url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Unavailable(format!("cannot create redis pool: {e}")))?;

        Ok(Arc::new(Self { pool, locks: DashMap::new(), op_timeout }))
    }

    fn user_key(email: &str) -> String {
        format!("user:{email}")
    }

    async fn conn(&self) -> Result<Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(format!("redis connection: {e}")))
    }

    /// Per-email mutex serializing read-modify-write sequences issued from
    /// this process. The map only ever grows by distinct emails seen.
    fn key_lock(&self, email: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(email.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn decode(key: &str, bytes: &[u8]) -> Result<UserRecord, StoreError> {
        serde_json::from_slice(bytes)
            .map_err(|e| StoreError::Unavailable(format!("corrupt record at {key}: {e}")))
    }
}

#[async_trait]
impl UserStore for RedisUserStore {
    async fn find_user(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let key = Self::user_key(email);
        let mut conn = io_timeout(self.op_timeout, self.conn()).await?;

        let bytes: Option<Vec<u8>> = io_timeout(self.op_timeout, async {
            conn.get(&key).await.map_err(StoreError::unavailable)
        })
        .await?;

        match bytes {
            Some(b) => Ok(Some(Self::decode(&key, &b)?)),
            None => Ok(None),
        }
    }

    async fn add_user(&self, email: &str, workspace_name: &str) -> Result<UserRecord, StoreError> {
        user::validate_email(email)?;
        user::validate_workspace_name(workspace_name)?;

        let lock = self.key_lock(email);
        let _guard = lock.lock().await;

        let key = Self::user_key(email);
        let record = UserRecord::new_stamped(email, workspace_name);
        let payload = serde_json::to_vec(&record).map_err(StoreError::unavailable)?;

        let mut conn = io_timeout(self.op_timeout, self.conn()).await?;
        // SETNX: created only if the key was absent, in one round-trip
        let created: bool = io_timeout(self.op_timeout, async {
            conn.set_nx(&key, payload.as_slice()).await.map_err(StoreError::unavailable)
        })
        .await?;

        if !created {
            return Err(StoreError::DuplicateKey(email.to_string()));
        }
        Ok(record)
    }

    async fn update_user(&self, email: &str, workspace_name: &str) -> Result<UserRecord, StoreError> {
        user::validate_workspace_name(workspace_name)?;

        let lock = self.key_lock(email);
        let _guard = lock.lock().await;

        let key = Self::user_key(email);
        let mut conn = io_timeout(self.op_timeout, self.conn()).await?;

        let bytes: Option<Vec<u8>> = io_timeout(self.op_timeout, async {
            conn.get(&key).await.map_err(StoreError::unavailable)
        })
        .await?;
        let Some(b) = bytes else {
            return Err(StoreError::NotFound(email.to_string()));
        };

        let mut record = Self::decode(&key, &b)?;
        record.workspace_name = workspace_name.to_string();
        let payload = serde_json::to_vec(&record).map_err(StoreError::unavailable)?;

        let _: () = io_timeout(self.op_timeout, async {
            conn.set(&key, payload.as_slice()).await.map_err(StoreError::unavailable)
        })
        .await?;
        Ok(record)
    }
}

// These tests need a live Redis; set TEST_REDIS_URL (e.g. redis://127.0.0.1:6379/15)
// to run them, they are skipped otherwise.
#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_store() -> Option<Arc<RedisUserStore>> {
        let url = std::env::var("TEST_REDIS_URL").ok()?;
        Some(RedisUserStore::connect(&url, Duration::from_secs(5)).expect("pool init"))
    }

    fn unique_email() -> String {
        format!("user_{}@example.com", Uuid::new_v4())
    }

    #[tokio::test]
    async fn redis_add_find_update_cycle() -> Result<(), anyhow::Error> {
        let Some(store) = test_store() else { return Ok(()) };
        let email = unique_email();

        assert!(store.find_user(&email).await?.is_none());

        let added = store.add_user(&email, "Acme").await?;
        assert_eq!(added.email, email);
        // remote backend stamps creation time
        assert!(added.created_at.is_some());

        let found = store.find_user(&email).await?.expect("present");
        assert_eq!(found, added);

        let updated = store.update_user(&email, "Acme2").await?;
        assert_eq!(updated.workspace_name, "Acme2");
        // creation time survives updates
        assert_eq!(updated.created_at, added.created_at);

        Ok(())
    }

    #[tokio::test]
    async fn redis_duplicate_add_rejected() -> Result<(), anyhow::Error> {
        let Some(store) = test_store() else { return Ok(()) };
        let email = unique_email();

        let first = store.add_user(&email, "Acme").await?;
        assert!(matches!(store.add_user(&email, "Acme2").await, Err(StoreError::DuplicateKey(_))));
        let found = store.find_user(&email).await?.expect("present");
        assert_eq!(found, first);
        Ok(())
    }

    #[tokio::test]
    async fn redis_update_missing_is_not_found() -> Result<(), anyhow::Error> {
        let Some(store) = test_store() else { return Ok(()) };
        let email = unique_email();

        assert!(matches!(store.update_user(&email, "W").await, Err(StoreError::NotFound(_))));
        assert!(store.find_user(&email).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn redis_concurrent_adds_admit_exactly_one() -> Result<(), anyhow::Error> {
        let Some(store) = test_store() else { return Ok(()) };
        let email = unique_email();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let email = email.clone();
            handles.push(tokio::spawn(async move {
                store.add_user(&email, &format!("W{i}")).await
            }));
        }

        let mut ok = 0;
        for h in handles {
            if h.await?.is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        Ok(())
    }
}
