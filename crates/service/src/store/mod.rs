//! User store abstraction
//!
//! One trait, two interchangeable backends:
//! - [`file::FileUserStore`] persists the whole record list as one JSON file.
//! - [`redis::RedisUserStore`] keeps one key per user in a remote Redis.
//!
//! The backend is chosen once at startup by [`select_store`]; everything
//! downstream holds an `Arc<dyn UserStore>` and never branches on the medium.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use configs::StoreConfig;
use models::user::UserRecord;

use crate::errors::StoreError;

pub mod file;
pub mod redis;

/// Uniform user record store over a file or remote KV medium.
///
/// Invariants, identical across backends:
/// - at most one record per email at any time;
/// - `add_user` fails with `DuplicateKey` for an existing email;
/// - `update_user` fails with `NotFound` for a missing email and mutates only
///   the workspace name;
/// - failed calls leave the store unchanged, successful mutations are
///   persisted before returning.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact-email lookup. Absent is `Ok(None)`, never an error.
    async fn find_user(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Create a record. The remote backend stamps `created_at`; the file
    /// backend does not.
    async fn add_user(&self, email: &str, workspace_name: &str) -> Result<UserRecord, StoreError>;

    /// Replace the workspace name of an existing record.
    async fn update_user(&self, email: &str, workspace_name: &str)
        -> Result<UserRecord, StoreError>;
}

/// Construct the store selected by configuration: a non-empty `redis_url`
/// means Redis, anything else means the file backend. Decided once, never
/// re-evaluated at runtime; the two media are independent universes and no
/// data migrates between them.
pub async fn select_store(cfg: &StoreConfig) -> Result<Arc<dyn UserStore>, StoreError> {
    let op_timeout = Duration::from_secs(cfg.op_timeout_secs);
    if cfg.use_redis() {
        info!(backend = "redis", "selecting user store");
        let store: Arc<dyn UserStore> = redis::RedisUserStore::connect(cfg.redis_url.trim(), op_timeout)?;
        Ok(store)
    } else {
        info!(backend = "file", path = %cfg.users_file, "selecting user store");
        let store: Arc<dyn UserStore> = file::FileUserStore::new(&cfg.users_file, op_timeout).await?;
        Ok(store)
    }
}

/// Bound a backend I/O future; elapsed time maps to `Unavailable`.
pub(crate) async fn io_timeout<T, F>(dur: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(dur, fut).await {
        Ok(res) => res,
        Err(_) => Err(StoreError::Unavailable(format!(
            "operation timed out after {}s",
            dur.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn file_cfg(path: &std::path::Path) -> StoreConfig {
        StoreConfig {
            redis_url: String::new(),
            users_file: path.to_string_lossy().into_owned(),
            op_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn empty_redis_url_selects_file_backend() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("select_store_{}.json", Uuid::new_v4()));
        let store = select_store(&file_cfg(&tmp)).await?;

        store.add_user("a@x.com", "Acme").await?;
        // a write through the selected store must land in the configured file
        let on_disk = tokio::fs::read(&tmp).await?;
        assert!(!on_disk.is_empty());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn file_backends_on_different_paths_are_independent() -> Result<(), anyhow::Error> {
        let tmp_a = std::env::temp_dir().join(format!("select_store_a_{}.json", Uuid::new_v4()));
        let tmp_b = std::env::temp_dir().join(format!("select_store_b_{}.json", Uuid::new_v4()));

        let store_a = select_store(&file_cfg(&tmp_a)).await?;
        store_a.add_user("a@x.com", "Acme").await?;

        // switching configuration never migrates data
        let store_b = select_store(&file_cfg(&tmp_b)).await?;
        assert!(store_b.find_user("a@x.com").await?.is_none());

        let _ = tokio::fs::remove_file(&tmp_a).await;
        let _ = tokio::fs::remove_file(&tmp_b).await;
        Ok(())
    }

    #[tokio::test]
    async fn io_timeout_maps_to_unavailable() {
        let res: Result<(), StoreError> = io_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(res, Err(StoreError::Unavailable(_))));
    }
}
