//! Errors - エラー型と分類
//!
//! `CatalogError` が呼び出し側に返る唯一のエラー型です。
//! ストレージ層のエラー（`StorageError`）もここで定義し、`CatalogError` で包みます。
//!
//! file 書き込み後に record 作成が失敗した状態（partial write drift）は
//! variant を持ちません。呼び出し側には record 作成の失敗がそのまま返り、
//! ドリフト自体はログと Auditor で検出します。

use crate::domain::ids::ProductId;

/// ErrorKind はエラーの運用分類
///
/// # 分類
/// - Caller: 呼び出し側の入力・認証の問題（そのまま返す）
/// - Conflict: 既存データとの衝突（削除してから再実行）
/// - Infrastructure: ストレージ・DB の障害
///
/// どの分類でもこのサブシステム内で自動リトライはしません。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Caller,
    Conflict,
    Infrastructure,
}

/// StorageError はストレージ操作のエラー
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid storage name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// CatalogError はドメインエラー
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("variant with color '{color}' already exists for product {product_id}")]
    DuplicateVariant { product_id: ProductId, color: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("storage write failed for '{logical_name}': {source}")]
    StorageWriteFailed {
        logical_name: String,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("repository error: {0}")]
    Repository(String),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Unauthorized(_)
            | CatalogError::NotFound { .. }
            | CatalogError::Validation { .. } => ErrorKind::Caller,
            CatalogError::DuplicateVariant { .. } => ErrorKind::Conflict,
            CatalogError::StorageWriteFailed { .. }
            | CatalogError::Storage(_)
            | CatalogError::Repository(_) => ErrorKind::Infrastructure,
        }
    }
}
