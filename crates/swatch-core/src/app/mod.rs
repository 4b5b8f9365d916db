//! App - アプリケーション層
//!
//! ports を組み合わせてユースケースを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **UploadPipeline**: バリアント画像のアップロード・削除
//! - **ConsistencyAuditor**: DB とストレージのずれの検出（読み取り専用）
//! - **seed_demo_catalog**: デモデータの投入

pub mod auditor;
pub mod builder;
pub mod seed;
pub mod upload;

// 主要な型を再エクスポート
pub use self::auditor::ConsistencyAuditor;
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::seed::{SeedSummary, seed_demo_catalog};
pub use self::upload::{DeletedVariant, ProductLocks, UploadPipeline, UploadRequest, UploadedVariant};
