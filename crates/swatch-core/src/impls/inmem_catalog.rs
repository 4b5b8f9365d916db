//! InMemoryCatalog - テスト用の正本
//!
//! CatalogStore と VariantRepository を 1 つの Mutex の下で実装します。
//! 一意制約（category 名、sku、(product, color)）は索引 HashMap で表現し、
//! 挿入の可否は同じロックの中で判定するので check-then-insert の競合は起きません。

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::catalog::{validate_category_name, validate_sku};
use crate::domain::variant::normalize_alt_text;
use crate::domain::{
    CatalogError, Category, CategoryDefaults, CategoryId, Color, Product, ProductChanges,
    ProductDefaults, ProductId, ProductImage, StoredPath, VariantId,
};
use crate::ports::{CatalogStore, Clock, IdGenerator, SystemClock, UlidGenerator, VariantRepository};

#[derive(Default)]
struct State {
    categories: HashMap<CategoryId, Category>,
    category_names: HashMap<String, CategoryId>,
    /// seq -> product（作成順）
    products: BTreeMap<u64, Product>,
    product_index: HashMap<ProductId, u64>,
    product_skus: HashMap<String, ProductId>,
    /// seq -> variant（作成順）
    variants: BTreeMap<u64, ProductImage>,
    variant_index: HashMap<VariantId, u64>,
    /// (product, color) の一意索引
    variant_keys: HashMap<(ProductId, String), u64>,
    next_seq: u64,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn product_mut(&mut self, id: ProductId) -> Result<&mut Product, CatalogError> {
        let seq = self
            .product_index
            .get(&id)
            .copied()
            .ok_or_else(|| CatalogError::not_found("product", id))?;
        self.products
            .get_mut(&seq)
            .ok_or_else(|| CatalogError::not_found("product", id))
    }

    fn remove_variant(&mut self, seq: u64) -> Option<ProductImage> {
        let variant = self.variants.remove(&seq)?;
        self.variant_index.remove(&variant.id);
        self.variant_keys
            .remove(&(variant.product_id, variant.color.as_str().to_string()));
        Some(variant)
    }

    fn variant_seqs_for(&self, product_id: ProductId) -> Vec<u64> {
        self.variants
            .iter()
            .filter(|(_, v)| v.product_id == product_id)
            .map(|(seq, _)| *seq)
            .collect()
    }
}

/// InMemoryCatalog はテスト・開発用のカタログストア
///
/// # 使用例
/// ```ignore
/// let catalog = InMemoryCatalog::new();
/// let (category, _) = catalog.get_or_create_category("Office Chairs", Default::default()).await?;
/// ```
#[derive(Clone)]
pub struct InMemoryCatalog {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            ids: Arc::new(UlidGenerator::new(clock.clone())),
            clock,
        }
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get_or_create_category(
        &self,
        name: &str,
        defaults: CategoryDefaults,
    ) -> Result<(Category, bool), CatalogError> {
        validate_category_name(name)?;
        let mut state = self.state.lock().await;

        if let Some(id) = state.category_names.get(name) {
            if let Some(existing) = state.categories.get(id) {
                return Ok((existing.clone(), false));
            }
        }

        let category = Category {
            id: self.ids.generate_category_id(),
            name: name.to_string(),
            description: defaults.description,
            created_at: self.clock.now(),
        };
        state.category_names.insert(category.name.clone(), category.id);
        state.categories.insert(category.id, category.clone());
        Ok((category, true))
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category, CatalogError> {
        self.state
            .lock()
            .await
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("category", id))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let state = self.state.lock().await;
        let mut categories: Vec<_> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_or_create_product(
        &self,
        sku: &str,
        defaults: ProductDefaults,
    ) -> Result<(Product, bool), CatalogError> {
        validate_sku(sku)?;
        let mut state = self.state.lock().await;

        if let Some(id) = state.product_skus.get(sku).copied() {
            return Ok((state.product_mut(id)?.clone(), false));
        }

        defaults.validate()?;
        if !state.categories.contains_key(&defaults.category_id) {
            return Err(CatalogError::not_found("category", defaults.category_id));
        }

        let now = self.clock.now();
        let product = Product {
            id: self.ids.generate_product_id(),
            name: defaults.name,
            sku: sku.to_string(),
            category_id: defaults.category_id,
            description: defaults.description,
            price: defaults.price,
            stock: defaults.stock,
            is_active: defaults.is_active,
            main_image: None,
            created_at: now,
            updated_at: now,
        };
        let seq = state.next_seq();
        state.product_skus.insert(product.sku.clone(), product.id);
        state.product_index.insert(product.id, seq);
        state.products.insert(seq, product.clone());
        Ok((product, true))
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        Ok(self.state.lock().await.product_mut(id)?.clone())
    }

    async fn find_product_by_sku(&self, sku: &str) -> Result<Option<Product>, CatalogError> {
        let mut state = self.state.lock().await;
        match state.product_skus.get(sku).copied() {
            Some(id) => Ok(Some(state.product_mut(id)?.clone())),
            None => Ok(None),
        }
    }

    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.state.lock().await.products.values().cloned().collect())
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, CatalogError> {
        changes.validate()?;
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let product = state.product_mut(id)?;
        changes.apply(product);
        product.updated_at = now;
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;
        let seq = state
            .product_index
            .remove(&id)
            .ok_or_else(|| CatalogError::not_found("product", id))?;
        if let Some(product) = state.products.remove(&seq) {
            state.product_skus.remove(&product.sku);
        }
        for variant_seq in state.variant_seqs_for(id) {
            state.remove_variant(variant_seq);
        }
        Ok(())
    }

    async fn set_main_image(
        &self,
        id: ProductId,
        path: Option<StoredPath>,
    ) -> Result<Product, CatalogError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let product = state.product_mut(id)?;
        product.main_image = path;
        product.updated_at = now;
        Ok(product.clone())
    }

    async fn set_main_image_if_unset(
        &self,
        id: ProductId,
        path: &StoredPath,
    ) -> Result<bool, CatalogError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let product = state.product_mut(id)?;
        if product.main_image.is_some() {
            return Ok(false);
        }
        product.main_image = Some(path.clone());
        product.updated_at = now;
        Ok(true)
    }
}

#[async_trait]
impl VariantRepository for InMemoryCatalog {
    async fn create(
        &self,
        product_id: ProductId,
        color: &Color,
        path: &StoredPath,
        alt_text: Option<&str>,
    ) -> Result<ProductImage, CatalogError> {
        let mut state = self.state.lock().await;
        if !state.product_index.contains_key(&product_id) {
            return Err(CatalogError::not_found("product", product_id));
        }

        let key = (product_id, color.as_str().to_string());
        if state.variant_keys.contains_key(&key) {
            return Err(CatalogError::DuplicateVariant {
                product_id,
                color: color.as_str().to_string(),
            });
        }

        let variant = ProductImage {
            id: self.ids.generate_variant_id(),
            product_id,
            color: color.clone(),
            path: path.clone(),
            alt_text: normalize_alt_text(alt_text),
            created_at: self.clock.now(),
        };
        let seq = state.next_seq();
        state.variant_keys.insert(key, seq);
        state.variant_index.insert(variant.id, seq);
        state.variants.insert(seq, variant.clone());
        Ok(variant)
    }

    async fn list_by_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, CatalogError> {
        let state = self.state.lock().await;
        Ok(state
            .variants
            .values()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn get(&self, id: VariantId) -> Result<ProductImage, CatalogError> {
        let state = self.state.lock().await;
        state
            .variant_index
            .get(&id)
            .and_then(|seq| state.variants.get(seq))
            .cloned()
            .ok_or_else(|| CatalogError::not_found("variant", id))
    }

    async fn delete(&self, id: VariantId) -> Result<ProductImage, CatalogError> {
        let mut state = self.state.lock().await;
        let seq = state
            .variant_index
            .get(&id)
            .copied()
            .ok_or_else(|| CatalogError::not_found("variant", id))?;
        state
            .remove_variant(seq)
            .ok_or_else(|| CatalogError::not_found("variant", id))
    }

    async fn delete_all_for_product(&self, product_id: ProductId) -> Result<usize, CatalogError> {
        let mut state = self.state.lock().await;
        let seqs = state.variant_seqs_for(product_id);
        for seq in &seqs {
            state.remove_variant(*seq);
        }
        Ok(seqs.len())
    }
}
