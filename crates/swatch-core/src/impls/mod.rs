//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStorage**: テスト・開発用のファイルストレージ
//! - **LocalStorage**: media root 配下のファイルシステム
//! - **InMemoryCatalog**: テスト用の正本（CatalogStore + VariantRepository）
//! - **SqliteCatalog**: sqlx + SQLite の正本
//! - **StaticTokenAuthorizer**: 設定ファイルのトークン表

pub mod inmem_catalog;
pub mod inmem_storage;
pub mod local_storage;
pub mod sqlite_catalog;
pub mod static_authorizer;

// 主要な型を再エクスポート
pub use self::inmem_catalog::InMemoryCatalog;
pub use self::inmem_storage::InMemoryStorage;
pub use self::local_storage::LocalStorage;
pub use self::sqlite_catalog::SqliteCatalog;
pub use self::static_authorizer::StaticTokenAuthorizer;
