//! InMemoryStorage - 開発・テスト用のストレージ
//!
//! BTreeMap<String, StoredFile> で path ごとにファイルを保持します。
//! BTreeMap なので `list(prefix)` はソート済みの範囲走査になります。

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::StoredPath;
use crate::domain::stored_file::{discriminated_path, fresh_discriminator, validate_storage_name};
use crate::ports::{StorageBackend, StorageError};

/// 保存されたファイル本体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: StoredPath,
    pub bytes: Bytes,
    pub content_type: String,
}

/// InMemoryStorage は開発・テスト用のストレージ
///
/// # 使用例
/// ```ignore
/// let storage = InMemoryStorage::new();
/// let path = storage.put("products/p/black.jpg", bytes, "image/jpeg").await?;
/// assert!(storage.exists(&path).await?);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    files: Arc<Mutex<BTreeMap<String, StoredFile>>>,
    #[cfg(test)]
    fail_writes: Arc<std::sync::atomic::AtomicBool>,
    #[cfg(test)]
    fail_deletes: Arc<std::sync::atomic::AtomicBool>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// content type も含めてファイルを取得
    pub async fn file(&self, path: &StoredPath) -> Option<StoredFile> {
        self.files.lock().await.get(path.as_str()).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.lock().await.is_empty()
    }

    /// 以降の `put` を I/O エラーにする（StorageWriteFailed の再現用）
    #[cfg(test)]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// 以降の `delete` を I/O エラーにする（孤立ファイルが残る状況の再現用）
    #[cfg(test)]
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn writes_fail(&self) -> bool {
        self.fail_writes.load(std::sync::atomic::Ordering::SeqCst)
    }

    #[cfg(not(test))]
    fn writes_fail(&self) -> bool {
        false
    }

    #[cfg(test)]
    fn deletes_fail(&self) -> bool {
        self.fail_deletes.load(std::sync::atomic::Ordering::SeqCst)
    }

    #[cfg(not(test))]
    fn deletes_fail(&self) -> bool {
        false
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn put(
        &self,
        logical_name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredPath, StorageError> {
        validate_storage_name(logical_name).map_err(|reason| StorageError::InvalidName {
            name: logical_name.to_string(),
            reason,
        })?;
        if self.writes_fail() {
            return Err(StorageError::Io(std::io::Error::other("injected write failure")));
        }

        let mut files = self.files.lock().await;
        let path = loop {
            let candidate = discriminated_path(logical_name, &fresh_discriminator());
            if !files.contains_key(candidate.as_str()) {
                break candidate;
            }
        };
        files.insert(
            path.as_str().to_string(),
            StoredFile {
                path: path.clone(),
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(path)
    }

    async fn exists(&self, path: &StoredPath) -> Result<bool, StorageError> {
        if validate_storage_name(path.as_str()).is_err() {
            return Ok(false);
        }
        Ok(self.files.lock().await.contains_key(path.as_str()))
    }

    async fn get(&self, path: &StoredPath) -> Result<Bytes, StorageError> {
        self.files
            .lock()
            .await
            .get(path.as_str())
            .map(|file| file.bytes.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &StoredPath) -> Result<(), StorageError> {
        if self.deletes_fail() {
            return Err(StorageError::Io(std::io::Error::other("injected delete failure")));
        }
        self.files
            .lock()
            .await
            .remove(path.as_str())
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredPath>, StorageError> {
        let files = self.files.lock().await;
        Ok(files
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, file)| file.path.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let storage = InMemoryStorage::new();
        let path = storage
            .put("products/p/black.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();

        assert!(path.as_str().starts_with("products/p/black_"));
        assert!(path.as_str().ends_with(".jpg"));
        assert_eq!(storage.get(&path).await.unwrap(), Bytes::from_static(b"jpeg"));
        assert_eq!(storage.file(&path).await.unwrap().content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_same_logical_name_never_collides() {
        let storage = InMemoryStorage::new();
        let a = storage
            .put("products/p/black.jpg", Bytes::from_static(b"a"), "image/jpeg")
            .await
            .unwrap();
        let b = storage
            .put("products/p/black.jpg", Bytes::from_static(b"b"), "image/jpeg")
            .await
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(storage.get(&a).await.unwrap(), Bytes::from_static(b"a"));
        assert_eq!(storage.len().await, 2);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let storage = InMemoryStorage::new();
        let path = StoredPath::new("products/p/nope.jpg");
        assert!(!storage.exists(&path).await.unwrap());
        assert!(matches!(storage.get(&path).await, Err(StorageError::NotFound(_))));
        assert!(matches!(storage.delete(&path).await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let storage = InMemoryStorage::new();
        let a = storage
            .put("products/a/x.png", Bytes::from_static(b"1"), "image/png")
            .await
            .unwrap();
        storage
            .put("products/b/x.png", Bytes::from_static(b"2"), "image/png")
            .await
            .unwrap();

        assert_eq!(storage.list("products/a/").await.unwrap(), vec![a]);
        assert_eq!(storage.list("products/").await.unwrap().len(), 2);
        assert!(storage.list("other/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected() {
        let storage = InMemoryStorage::new();
        let err = storage
            .put("../escape.jpg", Bytes::from_static(b"x"), "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidName { .. }));
        assert!(storage.is_empty().await);
        assert!(!storage.exists(&StoredPath::new("/media/x.jpg")).await.unwrap());
        assert!(!storage.exists(&StoredPath::new("")).await.unwrap());
    }
}
