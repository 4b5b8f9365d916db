//! CatalogStore port - カテゴリと商品の正本（source of truth）
//!
//! # 実装
//! - `impls::InMemoryCatalog`
//! - `impls::SqliteCatalog`

use async_trait::async_trait;

use crate::domain::{
    CatalogError, Category, CategoryDefaults, CategoryId, Product, ProductChanges,
    ProductDefaults, ProductId, StoredPath,
};

/// CatalogStore はカテゴリ・商品の CRUD と main image ポインタを管理
///
/// # 設計原則
/// - get-or-create は一意制約 + アトミックな条件付き insert で実装する
///   （並行に呼ばれても行は 1 つだけ）
/// - `main_image` はストレージ上の存在を検証しない緩い参照
/// - 商品削除は variant にカスケードする（ファイルは消さない）
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// name で探し、無ければ defaults で作る。`bool` は作成したかどうか
    async fn get_or_create_category(
        &self,
        name: &str,
        defaults: CategoryDefaults,
    ) -> Result<(Category, bool), CatalogError>;

    async fn get_category(&self, id: CategoryId) -> Result<Category, CatalogError>;

    /// 名前順
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;

    /// sku で探し、無ければ defaults で作る。`bool` は作成したかどうか
    ///
    /// defaults のカテゴリが存在しなければ `CatalogError::NotFound`
    async fn get_or_create_product(
        &self,
        sku: &str,
        defaults: ProductDefaults,
    ) -> Result<(Product, bool), CatalogError>;

    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError>;

    async fn find_product_by_sku(&self, sku: &str) -> Result<Option<Product>, CatalogError>;

    /// 作成順
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError>;

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, CatalogError>;

    /// 商品を削除（variant レコードもまとめて消える）
    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError>;

    /// main image を無条件に上書き（`None` でクリア）
    async fn set_main_image(
        &self,
        id: ProductId,
        path: Option<StoredPath>,
    ) -> Result<Product, CatalogError>;

    /// main image が未設定のときだけ設定する（compare-and-set）
    ///
    /// 設定したら `true`、既に設定済みなら `false`
    async fn set_main_image_if_unset(
        &self,
        id: ProductId,
        path: &StoredPath,
    ) -> Result<bool, CatalogError>;
}
