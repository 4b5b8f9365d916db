//! ConsistencyAuditor - DB とストレージのずれを検出
//!
//! 読み取り専用です。どのストアにも書き込まないので何度でも実行できます。
//!
//! # 検出するもの
//! - main image のファイルが無い
//! - バリアントがあるのに main image が未設定
//! - バリアントのファイルが無い
//! - どのレコードからも参照されていないファイル

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::stored_file::product_prefix;
use crate::domain::{
    AuditReport, CatalogError, Finding, MEDIA_PREFIX, Product, ProductAudit, ProductId,
    StorageError, StoredPath, VariantAudit,
};
use crate::ports::{CatalogStore, Clock, StorageBackend, VariantRepository};

pub struct ConsistencyAuditor {
    catalog: Arc<dyn CatalogStore>,
    variants: Arc<dyn VariantRepository>,
    storage: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
}

impl ConsistencyAuditor {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        variants: Arc<dyn VariantRepository>,
        storage: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            variants,
            storage,
            clock,
        }
    }

    /// 全商品とメディア領域全体を走査
    #[tracing::instrument(skip(self))]
    pub async fn audit(&self) -> Result<AuditReport, CatalogError> {
        let products = self.catalog.list_products().await?;
        let mut referenced = HashSet::new();
        let mut sections = Vec::with_capacity(products.len());
        let mut findings = Vec::new();

        for product in &products {
            let section = self.audit_section(product, &mut referenced).await?;
            findings.extend(section.findings());
            sections.push(section);
        }
        findings.extend(
            self.unreferenced_files(&format!("{MEDIA_PREFIX}/"), &referenced)
                .await?,
        );

        let report = AuditReport {
            generated_at: self.clock.now(),
            products: sections,
            findings,
        };
        let counts = report.counts();
        tracing::info!(
            products = counts.products,
            variants = counts.variants,
            drift = counts.drift_total(),
            "audit finished"
        );
        Ok(report)
    }

    /// 1 商品だけを走査（未参照ファイルはその商品の prefix 配下のみ）
    #[tracing::instrument(skip(self))]
    pub async fn audit_product(&self, product_id: ProductId) -> Result<AuditReport, CatalogError> {
        let product = self.catalog.get_product(product_id).await?;

        // 他商品の main image が同じ prefix 配下を指していることがある
        let mut referenced: HashSet<StoredPath> = self
            .catalog
            .list_products()
            .await?
            .into_iter()
            .filter_map(|p| p.main_image)
            .collect();

        let section = self.audit_section(&product, &mut referenced).await?;
        let mut findings = section.findings();
        findings.extend(
            self.unreferenced_files(&product_prefix(product_id), &referenced)
                .await?,
        );

        Ok(AuditReport {
            generated_at: self.clock.now(),
            products: vec![section],
            findings,
        })
    }

    async fn audit_section(
        &self,
        product: &Product,
        referenced: &mut HashSet<StoredPath>,
    ) -> Result<ProductAudit, CatalogError> {
        let main_image_exists = match &product.main_image {
            Some(path) => {
                referenced.insert(path.clone());
                Some(self.file_exists(path).await?)
            }
            None => None,
        };

        let records = self.variants.list_by_product(product.id).await?;
        let mut variants = Vec::with_capacity(records.len());
        for record in records {
            let file_exists = self.file_exists(&record.path).await?;
            referenced.insert(record.path.clone());
            variants.push(VariantAudit {
                variant_id: record.id,
                color: record.color,
                path: record.path,
                file_exists,
            });
        }

        Ok(ProductAudit {
            product_id: product.id,
            sku: product.sku.clone(),
            main_image: product.main_image.clone(),
            main_image_exists,
            variant_count: variants.len(),
            variants,
        })
    }

    /// main image は未検証のポインタなので、保存名として不正なら「無い」と数える
    async fn file_exists(&self, path: &StoredPath) -> Result<bool, CatalogError> {
        match self.storage.exists(path).await {
            Ok(exists) => Ok(exists),
            Err(StorageError::InvalidName { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn unreferenced_files(
        &self,
        prefix: &str,
        referenced: &HashSet<StoredPath>,
    ) -> Result<Vec<Finding>, CatalogError> {
        Ok(self
            .storage
            .list(prefix)
            .await?
            .into_iter()
            .filter(|path| !referenced.contains(path))
            .map(|path| Finding::UnreferencedFile { path })
            .collect())
    }
}
