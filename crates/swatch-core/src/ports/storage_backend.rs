//! StorageBackend port - 画像ファイルの保存先（Local / InMemory）
//!
//! StorageBackend は key → bytes の永続ストアです。
//! DB とのトランザクションは持たないため、DB とファイルのずれ（drift）は
//! ここでは防げません。検出は `app::auditor` が担当します。
//!
//! # 実装
//! - `impls::LocalStorage`: メディアルート配下のファイルシステム
//! - `impls::InMemoryStorage`: テスト・開発用

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::StoredPath;

pub use crate::domain::StorageError;

/// StorageBackend は画像ファイルを保存・取得する
///
/// # 設計原則
/// - `put` は上書きしない：同じ logical name でも毎回別の path を返す
/// - 返した path は `exists` / `get` / `delete` / `list` にそのまま使える
/// - 返した path は静的配信側でメディアルートからの相対パスとして解決できる
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// bytes を保存して、実際に使われた path を返す
    ///
    /// path は logical name に discriminator を挟んだもの
    /// （`products/p/black.jpg` → `products/p/black_<disc>.jpg`）。
    async fn put(
        &self,
        logical_name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredPath, StorageError>;

    /// 保存名として不正な path（絶対パス、空、`..` を含むなど）は `Ok(false)`
    ///
    /// main image のポインタは検証されないので、Auditor はこの結果を
    /// そのまま「ファイルが無い」として扱います。
    async fn exists(&self, path: &StoredPath) -> Result<bool, StorageError>;

    /// 存在しなければ `StorageError::NotFound`
    async fn get(&self, path: &StoredPath) -> Result<Bytes, StorageError>;

    /// 存在しなければ `StorageError::NotFound`
    async fn delete(&self, path: &StoredPath) -> Result<(), StorageError>;

    /// `prefix` で始まる全ファイルの path（ソート済み）
    async fn list(&self, prefix: &str) -> Result<Vec<StoredPath>, StorageError>;
}
