//! swatch-core
//!
//! Product image variant storage: per-color product images, the main image
//! pointer, and drift detection between the catalog database and file storage.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, catalog, variant, stored_file, policy, audit, errors）
//! - **ports**: 抽象化レイヤー（CatalogStore, VariantRepository, StorageBackend, Authorizer, Clock, IdGenerator）
//! - **impls**: 実装（InMemory*, SqliteCatalog, LocalStorage, StaticTokenAuthorizer）
//! - **app**: アプリケーションロジック（builder, upload, auditor, seed）
//! - **config**: 設定ファイル + 環境変数

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
