//! VariantRepository port - 商品ごとの色バリアント画像レコード
//!
//! # 実装
//! - `impls::InMemoryCatalog`
//! - `impls::SqliteCatalog`

use async_trait::async_trait;

use crate::domain::{CatalogError, Color, ProductId, ProductImage, StoredPath, VariantId};

/// VariantRepository は (product, color) を identity とするレコードを管理
///
/// # 設計原則
/// - `(product_id, color)` の一意性はストア自身が保証する（check-then-insert ではない）
/// - 更新操作は持たない：色やファイルを変えるなら delete → create
/// - 一覧は作成順で安定
#[async_trait]
pub trait VariantRepository: Send + Sync {
    /// レコードを作成
    ///
    /// - 同じ色が既にあれば `CatalogError::DuplicateVariant`
    /// - 商品が存在しなければ `CatalogError::NotFound`
    async fn create(
        &self,
        product_id: ProductId,
        color: &Color,
        path: &StoredPath,
        alt_text: Option<&str>,
    ) -> Result<ProductImage, CatalogError>;

    /// 商品のバリアント一覧（作成順）
    async fn list_by_product(&self, product_id: ProductId)
    -> Result<Vec<ProductImage>, CatalogError>;

    async fn get(&self, id: VariantId) -> Result<ProductImage, CatalogError>;

    /// 1 件削除して、削除したレコードを返す
    async fn delete(&self, id: VariantId) -> Result<ProductImage, CatalogError>;

    /// 商品のバリアントをすべて削除（商品削除時のカスケード）
    async fn delete_all_for_product(&self, product_id: ProductId) -> Result<usize, CatalogError>;
}
