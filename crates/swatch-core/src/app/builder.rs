//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - ストア・ストレージ・認可は必須
//! - build() 時に不足しているものをまとめて BuildError で返す
//! - ポリシー・Clock・サイズ上限はデフォルトあり

use std::path::PathBuf;
use std::sync::Arc;

use crate::app::{ConsistencyAuditor, UploadPipeline};
use crate::config::{Settings, UploadSettings};
use crate::domain::{CatalogError, FirstVariantWins, MainImagePolicy};
use crate::impls::{LocalStorage, SqliteCatalog, StaticTokenAuthorizer};
use crate::ports::{
    Authorizer, CatalogStore, Clock, StorageBackend, StorageError, SystemClock, VariantRepository,
};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let db = Arc::new(InMemoryCatalog::new());
/// let app = AppBuilder::new()
///     .with_database(db)
///     .with_storage(Arc::new(InMemoryStorage::new()))
///     .with_authorizer(Arc::new(authorizer))
///     .build()?;
/// ```
pub struct AppBuilder {
    catalog: Option<Arc<dyn CatalogStore>>,
    variants: Option<Arc<dyn VariantRepository>>,
    storage: Option<Arc<dyn StorageBackend>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    policy: Arc<dyn MainImagePolicy>,
    clock: Arc<dyn Clock>,
    max_upload_bytes: usize,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing components: {0:?}. These must be provided before build().")]
    MissingComponents(Vec<&'static str>),

    #[error("failed to open catalog database: {0}")]
    Database(#[source] CatalogError),

    #[error("failed to open media root {root}: {source}")]
    Storage {
        root: PathBuf,
        #[source]
        source: StorageError,
    },
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            catalog: None,
            variants: None,
            storage: None,
            authorizer: None,
            policy: Arc::new(FirstVariantWins),
            clock: Arc::new(SystemClock),
            max_upload_bytes: UploadSettings::default().max_bytes,
        }
    }

    /// 設定から本番用の構成（SQLite + ローカルファイル + トークン表）を組み立てる
    pub async fn from_settings(settings: &Settings) -> Result<Self, BuildError> {
        let database = SqliteCatalog::connect(&settings.database.url)
            .await
            .map_err(BuildError::Database)?;
        let storage = LocalStorage::open(&settings.storage.root)
            .await
            .map_err(|source| BuildError::Storage {
                root: settings.storage.root.clone(),
                source,
            })?;

        Ok(Self::new()
            .with_database(Arc::new(database))
            .with_storage(Arc::new(storage))
            .with_authorizer(Arc::new(StaticTokenAuthorizer::from_settings(&settings.auth)))
            .with_max_upload_bytes(settings.upload.max_bytes))
    }

    /// CatalogStore と VariantRepository を同じ DB で提供する
    pub fn with_database<D>(mut self, database: Arc<D>) -> Self
    where
        D: CatalogStore + VariantRepository + 'static,
    {
        self.catalog = Some(database.clone());
        self.variants = Some(database);
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    pub fn with_main_image_policy(mut self, policy: Arc<dyn MainImagePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_bytes: usize) -> Self {
        self.max_upload_bytes = max_bytes;
        self
    }

    /// # 検証
    /// - database / storage / authorizer が揃っているか
    /// - 不足があれば BuildError::MissingComponents
    pub fn build(self) -> Result<App, BuildError> {
        let mut missing = Vec::new();
        if self.catalog.is_none() || self.variants.is_none() {
            missing.push("database");
        }
        if self.storage.is_none() {
            missing.push("storage");
        }
        if self.authorizer.is_none() {
            missing.push("authorizer");
        }

        let (Some(catalog), Some(variants), Some(storage), Some(authorizer)) =
            (self.catalog, self.variants, self.storage, self.authorizer)
        else {
            return Err(BuildError::MissingComponents(missing));
        };

        tracing::debug!(policy = self.policy.name(), "app built");
        Ok(App {
            upload: UploadPipeline::new(
                catalog.clone(),
                variants.clone(),
                storage.clone(),
                authorizer,
                self.policy,
                self.max_upload_bytes,
            ),
            auditor: ConsistencyAuditor::new(
                catalog.clone(),
                variants.clone(),
                storage.clone(),
                self.clock,
            ),
            catalog,
            variants,
            storage,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は組み立て済みのサブシステム
pub struct App {
    pub upload: UploadPipeline,
    pub auditor: ConsistencyAuditor,
    pub catalog: Arc<dyn CatalogStore>,
    pub variants: Arc<dyn VariantRepository>,
    pub storage: Arc<dyn StorageBackend>,
}
