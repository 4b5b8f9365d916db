//! LocalStorage - ローカルファイルシステム上のストレージ
//!
//! root ディレクトリ配下に StoredPath をそのまま相対パスとして配置します。
//! 書き込みは `create_new` で行うため、既存ファイルを上書きすることはありません。

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::StoredPath;
use crate::domain::stored_file::{discriminated_path, fresh_discriminator, validate_storage_name};
use crate::ports::{StorageBackend, StorageError};

/// discriminator が衝突したときの再試行回数
const MAX_PUT_ATTEMPTS: usize = 8;

/// LocalStorage はディレクトリを media root とするストレージ
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// root を作成（既にあればそのまま）して開く
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "local storage opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        validate_storage_name(path).map_err(|reason| StorageError::InvalidName {
            name: path.to_string(),
            reason,
        })?;
        Ok(path.split('/').fold(self.root.clone(), |acc, segment| acc.join(segment)))
    }

    async fn write_new(&self, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(target)
            .await?;
        if let Err(e) = write_and_sync(&mut file, bytes).await {
            drop(file);
            // 書きかけのファイルを残さない
            let _ = fs::remove_file(target).await;
            return Err(e);
        }
        Ok(())
    }
}

async fn write_and_sync(file: &mut fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put(
        &self,
        logical_name: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<StoredPath, StorageError> {
        self.resolve(logical_name)?;

        for _ in 0..MAX_PUT_ATTEMPTS {
            let path = discriminated_path(logical_name, &fresh_discriminator());
            let target = self.resolve(path.as_str())?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            match self.write_new(&target, &bytes).await {
                Ok(()) => {
                    tracing::debug!(path = %path, size = bytes.len(), "file stored");
                    return Ok(path);
                }
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::Io(std::io::Error::new(
            IoErrorKind::AlreadyExists,
            format!("could not find a free name for '{logical_name}'"),
        )))
    }

    async fn exists(&self, path: &StoredPath) -> Result<bool, StorageError> {
        let target = match self.resolve(path.as_str()) {
            Ok(target) => target,
            Err(StorageError::InvalidName { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        match fs::metadata(&target).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, path: &StoredPath) -> Result<Bytes, StorageError> {
        let target = self.resolve(path.as_str())?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &StoredPath) -> Result<(), StorageError> {
        let target = self.resolve(path.as_str())?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredPath>, StorageError> {
        // prefix の直前のディレクトリから走査を始める
        let start_dir = match prefix.rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() => self.resolve(dir)?,
            _ => self.root.clone(),
        };

        let mut found = Vec::new();
        let mut pending = vec![start_dir];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == IoErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let full = entry.path();
                if file_type.is_dir() {
                    pending.push(full);
                } else if file_type.is_file() {
                    if let Some(relative) = relative_key(&self.root, &full) {
                        if relative.starts_with(prefix) {
                            found.push(StoredPath::new(relative));
                        }
                    }
                }
            }
        }
        found.sort();
        Ok(found)
    }
}

/// root からの相対パスを `/` 区切りの key にする（UTF-8 でない名前は無視）
fn relative_key(root: &Path, full: &Path) -> Option<String> {
    let relative = full.strip_prefix(root).ok()?;
    let segments = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(segments.join("/"))
}
