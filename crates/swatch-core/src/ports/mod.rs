//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（DB, ファイルストレージ, 認証基盤）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - DB（CatalogStore + VariantRepository）がレコードの正本
//! - StorageBackend はファイルの正本（DB とのトランザクションは無い）
//! - 両者のずれは Auditor が読み取り専用で検出する

pub mod authorizer;
pub mod catalog_store;
pub mod clock;
pub mod id_generator;
pub mod storage_backend;
pub mod variant_repository;

// 主要な trait を再エクスポート
pub use self::authorizer::Authorizer;
pub use self::catalog_store::CatalogStore;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::storage_backend::{StorageBackend, StorageError};
pub use self::variant_repository::VariantRepository;
