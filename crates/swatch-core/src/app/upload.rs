//! UploadPipeline - バリアント画像のアップロード
//!
//! # フロー
//! 1. 認可（Authorizer）
//! 2. 商品の存在確認
//! 3. 色・content type・サイズの検証、同色の重複チェック
//! 4. StorageBackend にファイルを書く
//! 5. VariantRepository にレコードを作る
//! 6. MainImagePolicy で main image を決める
//!
//! 3〜6 は商品ごとのロック（ProductLocks）の中で実行します。
//! プロセスをまたぐ競合はストアの一意制約と compare-and-set が防ぎます。
//!
//! # partial write drift
//! 4 が成功して 5 が失敗した場合、`tracing::error!` で記録し、
//! 孤立したファイルの削除を一度だけ試みます。削除にも失敗したファイルは
//! Auditor が `UnreferencedFile` として報告します。
//!
//! 5 の後に 6 が失敗した場合はバリアントを返し（`became_main: false`）、
//! エラーはログにだけ残します。

use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::stored_file::{extension_for, variant_logical_name};
use crate::domain::{
    CatalogError, Color, Credential, MainImageContext, MainImageDecision, MainImagePolicy,
    ProductId, ProductImage, StoredPath, VariantId,
};
use crate::ports::{Authorizer, CatalogStore, StorageBackend, StorageError, VariantRepository};

/// アップロード要求
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub product_id: ProductId,
    pub color: String,
    pub bytes: Bytes,
    pub content_type: String,
    pub alt_text: Option<String>,
    /// CallerDesignated ポリシーでのみ参照される
    pub make_main: bool,
    pub credential: Credential,
}

impl UploadRequest {
    pub fn new(
        product_id: ProductId,
        color: impl Into<String>,
        bytes: impl Into<Bytes>,
        content_type: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            product_id,
            color: color.into(),
            bytes: bytes.into(),
            content_type: content_type.into(),
            alt_text: None,
            make_main: false,
            credential,
        }
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = Some(alt_text.into());
        self
    }

    pub fn make_main(mut self) -> Self {
        self.make_main = true;
        self
    }
}

/// アップロード結果（アップロード API のレスポンス本体）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedVariant {
    pub id: VariantId,
    pub color: Color,
    pub path: StoredPath,
    pub alt_text: Option<String>,
    pub became_main: bool,
}

/// バリアント削除の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedVariant {
    pub variant: ProductImage,
    /// 参照が残っていなかったのでファイルも消した
    pub file_removed: bool,
}

/// 商品ごとの非同期ロック表
///
/// ロックを持っている間だけエントリが生きていればよいので、
/// 取得のたびに誰も使っていないエントリを掃除します。
#[derive(Clone, Default)]
pub struct ProductLocks {
    locks: Arc<Mutex<HashMap<ProductId, Arc<Mutex<()>>>>>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, product_id: ProductId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|id, lock| *id == product_id || Arc::strong_count(lock) > 1);
            locks.entry(product_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// UploadPipeline はバリアントの作成・削除を担当
pub struct UploadPipeline {
    catalog: Arc<dyn CatalogStore>,
    variants: Arc<dyn VariantRepository>,
    storage: Arc<dyn StorageBackend>,
    authorizer: Arc<dyn Authorizer>,
    policy: Arc<dyn MainImagePolicy>,
    locks: ProductLocks,
    max_bytes: usize,
}

impl UploadPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        variants: Arc<dyn VariantRepository>,
        storage: Arc<dyn StorageBackend>,
        authorizer: Arc<dyn Authorizer>,
        policy: Arc<dyn MainImagePolicy>,
        max_bytes: usize,
    ) -> Self {
        Self {
            catalog,
            variants,
            storage,
            authorizer,
            policy,
            locks: ProductLocks::new(),
            max_bytes,
        }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// バリアント画像をアップロード
    #[tracing::instrument(
        skip_all,
        fields(product_id = %request.product_id, color = %request.color, size = request.bytes.len())
    )]
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadedVariant, CatalogError> {
        let principal = self
            .authorizer
            .authorize_catalog_admin(&request.credential)
            .await?;
        let product = self.catalog.get_product(request.product_id).await?;
        let color = Color::new(request.color)?;
        let extension = self.validate_payload(&request.bytes, &request.content_type)?;

        let _guard = self.locks.lock(product.id).await;

        let existing = self.variants.list_by_product(product.id).await?;
        if existing.iter().any(|v| v.color == color) {
            return Err(CatalogError::DuplicateVariant {
                product_id: product.id,
                color: color.to_string(),
            });
        }

        let logical_name = variant_logical_name(product.id, &color, extension);
        let path = self
            .storage
            .put(&logical_name, request.bytes, &request.content_type)
            .await
            .map_err(|source| CatalogError::StorageWriteFailed {
                logical_name: logical_name.clone(),
                source,
            })?;

        let variant = match self
            .variants
            .create(product.id, &color, &path, request.alt_text.as_deref())
            .await
        {
            Ok(variant) => variant,
            Err(e) => {
                self.discard_orphan(&path, &e).await;
                return Err(e);
            }
        };

        // レコードは確定済みなので、ここでの失敗はアップロード自体を失敗にしない。
        // 未設定の main image は Auditor が `MainImageUnset` として報告する
        let became_main = match self.apply_main_image_policy(&variant, request.make_main).await {
            Ok(became_main) => became_main,
            Err(e) => {
                tracing::error!(
                    variant_id = %variant.id,
                    error = %e,
                    "main image update failed after the variant was recorded"
                );
                false
            }
        };

        tracing::info!(
            user = %principal.username,
            variant_id = %variant.id,
            path = %variant.path,
            became_main,
            "variant uploaded"
        );

        Ok(UploadedVariant {
            id: variant.id,
            color: variant.color,
            path: variant.path,
            alt_text: variant.alt_text,
            became_main,
        })
    }

    /// バリアントを削除
    ///
    /// 他のバリアントも main image も参照していなければファイルも消す。
    /// main image のポインタ自体は変更しない。
    #[tracing::instrument(skip(self, credential))]
    pub async fn delete_variant(
        &self,
        credential: &Credential,
        variant_id: VariantId,
    ) -> Result<DeletedVariant, CatalogError> {
        let principal = self.authorizer.authorize_catalog_admin(credential).await?;
        let variant = self.variants.get(variant_id).await?;

        let _guard = self.locks.lock(variant.product_id).await;
        let removed = self.variants.delete(variant_id).await?;

        let still_referenced = self
            .variants
            .list_by_product(removed.product_id)
            .await?
            .iter()
            .any(|v| v.path == removed.path)
            || self.is_main_image(removed.product_id, &removed.path).await?;

        let file_removed = if still_referenced {
            false
        } else {
            match self.storage.delete(&removed.path).await {
                Ok(()) => true,
                Err(StorageError::NotFound(_)) => false,
                Err(e) => {
                    tracing::warn!(path = %removed.path, error = %e, "failed to remove variant file");
                    false
                }
            }
        };

        tracing::info!(
            user = %principal.username,
            product_id = %removed.product_id,
            path = %removed.path,
            file_removed,
            "variant deleted"
        );
        Ok(DeletedVariant {
            variant: removed,
            file_removed,
        })
    }

    fn validate_payload(&self, bytes: &Bytes, content_type: &str) -> Result<&'static str, CatalogError> {
        let extension = extension_for(content_type).ok_or_else(|| {
            CatalogError::validation(
                "content_type",
                format!("'{content_type}' is not a supported image type"),
            )
        })?;
        if bytes.is_empty() {
            return Err(CatalogError::validation("image", "file is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(CatalogError::validation(
                "image",
                format!("{} bytes exceeds the limit of {} bytes", bytes.len(), self.max_bytes),
            ));
        }
        Ok(extension)
    }

    async fn apply_main_image_policy(
        &self,
        variant: &ProductImage,
        requested: bool,
    ) -> Result<bool, CatalogError> {
        let product = self.catalog.get_product(variant.product_id).await?;
        let siblings = self.variants.list_by_product(variant.product_id).await?;
        let ordinal = siblings
            .iter()
            .position(|v| v.id == variant.id)
            .unwrap_or(siblings.len());

        let decision = self.policy.decide(&MainImageContext {
            product: &product,
            variant,
            ordinal,
            requested,
        });
        tracing::debug!(policy = self.policy.name(), ordinal, ?decision, "main image decision");

        match decision {
            MainImageDecision::Keep => Ok(false),
            MainImageDecision::AssignIfUnset => {
                self.catalog
                    .set_main_image_if_unset(product.id, &variant.path)
                    .await
            }
            MainImageDecision::Overwrite => {
                self.catalog
                    .set_main_image(product.id, Some(variant.path.clone()))
                    .await?;
                Ok(true)
            }
        }
    }

    async fn is_main_image(&self, product_id: ProductId, path: &StoredPath) -> Result<bool, CatalogError> {
        match self.catalog.get_product(product_id).await {
            Ok(product) => Ok(product.main_image.as_ref() == Some(path)),
            Err(CatalogError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn discard_orphan(&self, path: &StoredPath, cause: &CatalogError) {
        tracing::error!(path = %path, error = %cause, "partial write drift: file stored but record not created");
        if let Err(e) = self.storage.delete(path).await {
            tracing::error!(path = %path, error = %e, "orphaned file left in storage");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CallerDesignated, CategoryDefaults, Principal, ProductDefaults};
    use crate::app::ConsistencyAuditor;
    use crate::domain::Finding;
    use crate::impls::{InMemoryCatalog, InMemoryStorage, StaticTokenAuthorizer};
    use crate::ports::SystemClock;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, Ordering};

    const TOKEN: &str = "admin-token";

    struct Fixture {
        catalog: Arc<InMemoryCatalog>,
        storage: Arc<InMemoryStorage>,
        pipeline: UploadPipeline,
        product_id: ProductId,
    }

    async fn fixture_with(policy: Arc<dyn MainImagePolicy>, max_bytes: usize) -> Fixture {
        let catalog = Arc::new(InMemoryCatalog::new());
        let storage = Arc::new(InMemoryStorage::new());
        let authorizer = StaticTokenAuthorizer::new()
            .with_token(TOKEN, Principal::staff("admin"))
            .with_token("shopper", Principal::customer("alice"));
        let (category, _) = catalog
            .get_or_create_category("Office Chairs", CategoryDefaults::default())
            .await
            .unwrap();
        let (product, _) = catalog
            .get_or_create_product(
                "CHAIR-001",
                ProductDefaults::new("Ergonomic Office Chair", category.id, Decimal::new(59999, 2)),
            )
            .await
            .unwrap();
        let pipeline = UploadPipeline::new(
            catalog.clone(),
            catalog.clone(),
            storage.clone(),
            Arc::new(authorizer),
            policy,
            max_bytes,
        );
        Fixture {
            catalog,
            storage,
            pipeline,
            product_id: product.id,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(crate::domain::FirstVariantWins), 1024).await
    }

    fn jpeg(product_id: ProductId, color: &str) -> UploadRequest {
        UploadRequest::new(
            product_id,
            color,
            Bytes::from_static(b"\xff\xd8\xff fake jpeg"),
            "image/jpeg",
            Credential::bearer(TOKEN),
        )
    }

    #[tokio::test]
    async fn test_first_variant_becomes_main() {
        let f = fixture().await;
        let black = f.pipeline.upload(jpeg(f.product_id, "Black")).await.unwrap();
        let gray = f.pipeline.upload(jpeg(f.product_id, "Gray")).await.unwrap();

        assert!(black.became_main);
        assert!(!gray.became_main);
        assert!(black.path.as_str().starts_with(&format!("products/{}/black_", f.product_id)));

        let product = f.catalog.get_product(f.product_id).await.unwrap();
        assert_eq!(product.main_image, Some(black.path.clone()));
        assert!(f.storage.exists(&black.path).await.unwrap());
        assert!(f.storage.exists(&gray.path).await.unwrap());
    }

    #[tokio::test]
    async fn test_existing_main_image_is_kept() {
        let f = fixture().await;
        let legacy = StoredPath::new("products/legacy.jpg");
        f.catalog
            .set_main_image(f.product_id, Some(legacy.clone()))
            .await
            .unwrap();

        let black = f.pipeline.upload(jpeg(f.product_id, "Black")).await.unwrap();
        assert!(!black.became_main);
        assert_eq!(
            f.catalog.get_product(f.product_id).await.unwrap().main_image,
            Some(legacy)
        );
    }

    #[tokio::test]
    async fn test_duplicate_color_leaves_state_untouched() {
        let f = fixture().await;
        let first = f
            .pipeline
            .upload(jpeg(f.product_id, "Black").with_alt_text("Black chair"))
            .await
            .unwrap();

        let err = f.pipeline.upload(jpeg(f.product_id, "Black")).await.unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateVariant { .. }));

        let variants = f.catalog.list_by_product(f.product_id).await.unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].alt_text.as_deref(), Some("Black chair"));
        assert_eq!(
            f.catalog.get_product(f.product_id).await.unwrap().main_image,
            Some(first.path)
        );
        // 2 回目はストレージに書かない
        assert_eq!(f.storage.len().await, 1);
    }

    #[rstest::rstest]
    #[case::missing("")]
    #[case::unknown("nope")]
    #[case::not_staff("shopper")]
    #[tokio::test]
    async fn test_unauthorized(#[case] token: &str) {
        let f = fixture().await;
        let mut request = jpeg(f.product_id, "Black");
        request.credential = Credential::bearer(token);

        let err = f.pipeline.upload(request).await.unwrap_err();
        assert!(matches!(err, CatalogError::Unauthorized(_)));
        assert!(f.storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let f = fixture().await;
        let missing = ProductId::from_ulid(ulid::Ulid::new());
        let err = f.pipeline.upload(jpeg(missing, "Black")).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "product", .. }));
    }

    #[rstest::rstest]
    #[case::blank_color("  ", "image/jpeg", 10, "color")]
    #[case::not_an_image("Black", "application/pdf", 10, "content_type")]
    #[case::empty("Black", "image/png", 0, "image")]
    #[case::too_large("Black", "image/png", 2048, "image")]
    #[tokio::test]
    async fn test_validation(
        #[case] color: &str,
        #[case] content_type: &str,
        #[case] size: usize,
        #[case] expected_field: &str,
    ) {
        let f = fixture().await;
        let request = UploadRequest::new(
            f.product_id,
            color,
            vec![0u8; size],
            content_type,
            Credential::bearer(TOKEN),
        );
        let err = f.pipeline.upload(request).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation { field, .. } if field == expected_field));
        assert!(f.storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_storage_failure_creates_no_record() {
        let f = fixture().await;
        f.storage.set_fail_writes(true);

        let err = f.pipeline.upload(jpeg(f.product_id, "Black")).await.unwrap_err();
        assert!(matches!(err, CatalogError::StorageWriteFailed { .. }));
        assert!(f.catalog.list_by_product(f.product_id).await.unwrap().is_empty());
        assert!(f.catalog.get_product(f.product_id).await.unwrap().main_image.is_none());
    }

    /// 指定したタイミングで Repository エラーを返す VariantRepository
    #[derive(Default)]
    struct FlakyVariants {
        inner: Arc<InMemoryCatalog>,
        fail_create: AtomicBool,
        fail_after_create: AtomicBool,
        created: AtomicBool,
    }

    impl FlakyVariants {
        fn new(inner: Arc<InMemoryCatalog>) -> Self {
            Self {
                inner,
                ..Default::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl VariantRepository for FlakyVariants {
        async fn create(
            &self,
            product_id: ProductId,
            color: &Color,
            path: &StoredPath,
            alt_text: Option<&str>,
        ) -> Result<ProductImage, CatalogError> {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(CatalogError::repository("insert failed"));
            }
            let variant = self.inner.create(product_id, color, path, alt_text).await?;
            self.created.store(true, Ordering::SeqCst);
            Ok(variant)
        }

        async fn list_by_product(&self, product_id: ProductId) -> Result<Vec<ProductImage>, CatalogError> {
            if self.fail_after_create.load(Ordering::SeqCst) && self.created.load(Ordering::SeqCst) {
                return Err(CatalogError::repository("connection lost"));
            }
            self.inner.list_by_product(product_id).await
        }

        async fn get(&self, id: VariantId) -> Result<ProductImage, CatalogError> {
            self.inner.get(id).await
        }

        async fn delete(&self, id: VariantId) -> Result<ProductImage, CatalogError> {
            VariantRepository::delete(self.inner.as_ref(), id).await
        }

        async fn delete_all_for_product(&self, product_id: ProductId) -> Result<usize, CatalogError> {
            self.inner.delete_all_for_product(product_id).await
        }
    }

    fn pipeline_with_variants(f: &Fixture, variants: Arc<dyn VariantRepository>) -> UploadPipeline {
        UploadPipeline::new(
            f.catalog.clone(),
            variants,
            f.storage.clone(),
            Arc::new(StaticTokenAuthorizer::new().with_token(TOKEN, Principal::staff("admin"))),
            Arc::new(crate::domain::FirstVariantWins),
            1024,
        )
    }

    fn auditor(f: &Fixture) -> ConsistencyAuditor {
        ConsistencyAuditor::new(
            f.catalog.clone(),
            f.catalog.clone(),
            f.storage.clone(),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn test_record_failure_discards_stored_file() {
        let f = fixture().await;
        let variants = FlakyVariants::new(f.catalog.clone());
        variants.fail_create.store(true, Ordering::SeqCst);
        let pipeline = pipeline_with_variants(&f, Arc::new(variants));

        let err = pipeline.upload(jpeg(f.product_id, "Black")).await.unwrap_err();
        assert!(matches!(&err, CatalogError::Repository(message) if message == "insert failed"));
        assert_eq!(f.storage.len().await, 0);
        assert!(f.catalog.list_by_product(f.product_id).await.unwrap().is_empty());
        assert!(f.catalog.get_product(f.product_id).await.unwrap().main_image.is_none());
        assert!(auditor(&f).audit().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_orphan_left_by_failed_cleanup_is_audited() {
        let f = fixture().await;
        let variants = FlakyVariants::new(f.catalog.clone());
        variants.fail_create.store(true, Ordering::SeqCst);
        let pipeline = pipeline_with_variants(&f, Arc::new(variants));
        f.storage.set_fail_deletes(true);

        let err = pipeline.upload(jpeg(f.product_id, "Black")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Repository(_)));
        assert_eq!(f.storage.len().await, 1);

        let orphan = f.storage.list("products/").await.unwrap().remove(0);
        let report = auditor(&f).audit().await.unwrap();
        assert_eq!(
            report.findings,
            vec![Finding::UnreferencedFile { path: orphan }]
        );
    }

    #[tokio::test]
    async fn test_main_image_failure_keeps_recorded_variant() {
        let f = fixture().await;
        let variants = FlakyVariants::new(f.catalog.clone());
        variants.fail_after_create.store(true, Ordering::SeqCst);
        let pipeline = pipeline_with_variants(&f, Arc::new(variants));

        let uploaded = pipeline.upload(jpeg(f.product_id, "Black")).await.unwrap();
        assert!(!uploaded.became_main);
        assert!(f.storage.exists(&uploaded.path).await.unwrap());
        assert_eq!(f.catalog.list_by_product(f.product_id).await.unwrap().len(), 1);
        assert!(f.catalog.get_product(f.product_id).await.unwrap().main_image.is_none());

        let report = auditor(&f).audit().await.unwrap();
        assert!(matches!(
            report.findings.as_slice(),
            [Finding::MainImageUnset { variant_count: 1, .. }]
        ));
    }

    #[tokio::test]
    async fn test_caller_designated_overwrites_main() {
        let f = fixture_with(Arc::new(CallerDesignated), 1024).await;
        let black = f.pipeline.upload(jpeg(f.product_id, "Black")).await.unwrap();
        let gray = f
            .pipeline
            .upload(jpeg(f.product_id, "Gray").make_main())
            .await
            .unwrap();
        let blue = f.pipeline.upload(jpeg(f.product_id, "Blue")).await.unwrap();

        assert!(black.became_main);
        assert!(gray.became_main);
        assert!(!blue.became_main);
        assert_eq!(
            f.catalog.get_product(f.product_id).await.unwrap().main_image,
            Some(gray.path)
        );
    }

    #[tokio::test]
    async fn test_concurrent_same_color_yields_one_variant() {
        let f = Arc::new(fixture().await);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let f = f.clone();
            handles.push(tokio::spawn(async move {
                f.pipeline.upload(jpeg(f.product_id, "Black")).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(CatalogError::DuplicateVariant { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(f.catalog.list_by_product(f.product_id).await.unwrap().len(), 1);
        assert_eq!(f.storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_colors_set_exactly_one_main() {
        let f = Arc::new(fixture().await);
        let mut handles = Vec::new();
        for color in ["Black", "Gray", "Blue", "Red"] {
            let f = f.clone();
            handles.push(tokio::spawn(async move {
                f.pipeline.upload(jpeg(f.product_id, color)).await.unwrap()
            }));
        }
        let mut mains = Vec::new();
        for handle in handles {
            let uploaded = handle.await.unwrap();
            if uploaded.became_main {
                mains.push(uploaded.path);
            }
        }

        assert_eq!(mains.len(), 1);
        let variants = f.catalog.list_by_product(f.product_id).await.unwrap();
        assert_eq!(variants.len(), 4);
        let product = f.catalog.get_product(f.product_id).await.unwrap();
        assert_eq!(product.main_image.as_ref(), Some(&variants[0].path));
        assert_eq!(product.main_image, Some(mains.remove(0)));
    }

    #[tokio::test]
    async fn test_delete_variant_removes_unreferenced_file() {
        let f = fixture().await;
        let black = f.pipeline.upload(jpeg(f.product_id, "Black")).await.unwrap();
        let gray = f.pipeline.upload(jpeg(f.product_id, "Gray")).await.unwrap();
        let credential = Credential::bearer(TOKEN);

        // Gray は main image ではないのでファイルも消える
        let deleted = f.pipeline.delete_variant(&credential, gray.id).await.unwrap();
        assert!(deleted.file_removed);
        assert!(!f.storage.exists(&gray.path).await.unwrap());

        // Black は main image が参照しているのでファイルは残る
        let deleted = f.pipeline.delete_variant(&credential, black.id).await.unwrap();
        assert!(!deleted.file_removed);
        assert!(f.storage.exists(&black.path).await.unwrap());
        assert_eq!(
            f.catalog.get_product(f.product_id).await.unwrap().main_image,
            Some(black.path)
        );

        // 削除後は同じ色をもう一度アップロードできる
        f.pipeline.upload(jpeg(f.product_id, "Gray")).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_variant_requires_authorization() {
        let f = fixture().await;
        let black = f.pipeline.upload(jpeg(f.product_id, "Black")).await.unwrap();
        let err = f
            .pipeline
            .delete_variant(&Credential::bearer("shopper"), black.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Unauthorized(_)));
        assert_eq!(f.catalog.list_by_product(f.product_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_product_locks_are_pruned() {
        let locks = ProductLocks::new();
        let a = ProductId::from_ulid(ulid::Ulid::new());
        let b = ProductId::from_ulid(ulid::Ulid::new());
        drop(locks.lock(a).await);
        let _held = locks.lock(b).await;
        assert_eq!(locks.len().await, 1);
    }
}
