use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};

use models::user::{self, UserRecord};

use crate::errors::StoreError;
use crate::store::{io_timeout, UserStore};

/// File-backed user store.
///
/// One JSON file holds the full record list; every operation reads the whole
/// list and every mutation rewrites it. O(n) per call, fine at the scale this
/// registry runs at. The rewrite goes through a temp sibling plus rename so a
/// crash mid-write can never leave a truncated file behind.
pub struct FileUserStore {
    file_path: PathBuf,
    // Held for write across load-check-persist so concurrent add/update calls
    // for the same email cannot both pass the existence check.
    lock: RwLock<()>,
    op_timeout: Duration,
}

impl FileUserStore {
    /// Initialize the store from a path. Creates parent directories; the file
    /// itself appears on first successful mutation.
    pub async fn new<P: Into<PathBuf>>(path: P, op_timeout: Duration) -> Result<Arc<Self>, StoreError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }

        Ok(Arc::new(Self { file_path, lock: RwLock::new(()), op_timeout }))
    }

    /// Load the full sequence. A missing or empty file is an empty sequence;
    /// an unreadable or undeserializable file is `Unavailable`.
    async fn load(&self) -> Result<Vec<UserRecord>, StoreError> {
        match fs::read(&self.file_path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Unavailable(format!("corrupt user file: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::unavailable(e)),
        }
    }

    /// Serialize the full sequence and replace the file atomically.
    async fn save(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(users).map_err(StoreError::unavailable)?;
        let tmp = self.file_path.with_extension("json.tmp");
        fs::write(&tmp, &data).await.map_err(StoreError::unavailable)?;
        fs::rename(&tmp, &self.file_path).await.map_err(StoreError::unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn find_user(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let _guard = self.lock.read().await;
        let users = io_timeout(self.op_timeout, self.load()).await?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    async fn add_user(&self, email: &str, workspace_name: &str) -> Result<UserRecord, StoreError> {
        user::validate_email(email)?;
        user::validate_workspace_name(workspace_name)?;

        let _guard = self.lock.write().await;
        let mut users = io_timeout(self.op_timeout, self.load()).await?;
        if users.iter().any(|u| u.email == email) {
            return Err(StoreError::DuplicateKey(email.to_string()));
        }

        let record = UserRecord::new(email, workspace_name);
        users.push(record.clone());
        io_timeout(self.op_timeout, self.save(&users)).await?;
        Ok(record)
    }

    async fn update_user(&self, email: &str, workspace_name: &str) -> Result<UserRecord, StoreError> {
        user::validate_workspace_name(workspace_name)?;

        let _guard = self.lock.write().await;
        let mut users = io_timeout(self.op_timeout, self.load()).await?;
        let Some(found) = users.iter_mut().find(|u| u.email == email) else {
            return Err(StoreError::NotFound(email.to_string()));
        };

        found.workspace_name = workspace_name.to_string();
        let record = found.clone();
        io_timeout(self.op_timeout, self.save(&users)).await?;
        Ok(record)
    }
}
