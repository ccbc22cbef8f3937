//! # Key-Value Store
//!
//! 字符串键、字符串值的持久化存储，相当于网页版的 `localStorage`。
//!
//! - [`MemoryStore`]：纯内存实现，用于测试和临时会话
//! - [`JsonFileStore`]：单个 JSON 对象文件，启动时加载，每次修改整体重写

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StorageResult;

/// 键值存储 trait
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 读取键
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// 写入键（覆盖）
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// 删除键，不存在时无操作
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// 列出所有键
    async fn keys(&self) -> StorageResult<Vec<String>>;

    /// 清空存储
    async fn clear(&self) -> StorageResult<()>;
}

/// 内存键值存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.entries.write().clear();
        Ok(())
    }
}

/// JSON 文件键值存储
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
    /// 串行化 "修改 + 写盘"，保证落盘顺序与修改顺序一致
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// 打开存储文件，文件不存在时视为空存储
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();

        let entries = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        info!("JsonFileStore opened at {:?} ({} keys)", path, entries.len());

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 在写锁内修改并落盘
    async fn mutate<F>(&self, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.write_lock.lock().await;

        let content = {
            let mut entries = self.entries.write();
            f(&mut entries);
            serde_json::to_string_pretty(&*entries)?
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // 先写临时文件再 rename，避免中途崩溃留下半个文件
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.path).await?;

        debug!("JsonFileStore flushed to {:?}", self.path);
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.mutate(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        if !self.entries.read().contains_key(key) {
            return Ok(());
        }
        let key = key.to_string();
        self.mutate(move |entries| {
            entries.remove(&key);
        })
        .await
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.mutate(|entries| entries.clear()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);

        store.set("trialAttempts", "2").await.unwrap();
        assert_eq!(store.get("trialAttempts").await.unwrap().as_deref(), Some("2"));

        store.remove("trialAttempts").await.unwrap();
        store.remove("trialAttempts").await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("state.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.set("phoneNumber", "+15551234567").await.unwrap();
        store.set("isVerified", "true").await.unwrap();
        store.remove("isVerified").await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("phoneNumber").await.unwrap().as_deref(),
            Some("+15551234567")
        );
        assert_eq!(reopened.get("isVerified").await.unwrap(), None);
        assert_eq!(reopened.keys().await.unwrap(), vec!["phoneNumber".to_string()]);
    }

    #[tokio::test]
    async fn test_file_store_clear() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.set("a", "1").await.unwrap();
        store.clear().await.unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert!(reopened.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let result = JsonFileStore::open(&path).await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }
}
