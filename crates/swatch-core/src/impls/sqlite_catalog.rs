//! SqliteCatalog - SQLite 上の正本
//!
//! CatalogStore と VariantRepository を同じ SqlitePool で実装します。
//!
//! # 一意性
//! - categories.name / products.sku / product_images(product_id, color) は UNIQUE 制約
//! - get-or-create は `INSERT ... ON CONFLICT DO NOTHING` → SELECT
//! - main image の compare-and-set は `UPDATE ... WHERE main_image IS NULL`
//!
//! # 保存形式
//! - ID は表示形式の文字列（`prod-01...`）
//! - 価格は TEXT（Decimal の精度を落とさない）
//! - 時刻は RFC 3339 の TEXT

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{
    Row,
    sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
        SqliteSynchronous,
    },
};
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::catalog::{validate_category_name, validate_sku};
use crate::domain::variant::normalize_alt_text;
use crate::domain::{
    CatalogError, Category, CategoryDefaults, CategoryId, Color, Product, ProductChanges,
    ProductDefaults, ProductId, ProductImage, StoredPath, VariantId,
};
use crate::ports::{CatalogStore, Clock, IdGenerator, SystemClock, UlidGenerator, VariantRepository};

const PRODUCT_COLUMNS: &str = "id, name, sku, category_id, description, price, stock, is_active, \
     main_image, created_at, updated_at";

const VARIANT_COLUMNS: &str = "id, product_id, color, path, alt_text, created_at";

/// SqliteCatalog は SQLite を正本とするカタログストア
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl SqliteCatalog {
    /// `sqlite://path/to/swatch.db` 形式の URL で接続し、スキーマを作成
    pub async fn connect(url: &str) -> Result<Self, CatalogError> {
        if url.contains(":memory:") {
            return Self::in_memory().await;
        }
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| CatalogError::repository(format!("invalid SQLite url '{url}': {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| CatalogError::repository(format!("failed to connect to SQLite: {e}")))?;

        tracing::debug!(url, "sqlite catalog connected");
        Self::from_pool(pool, Arc::new(SystemClock)).await
    }

    /// プロセス内だけで生きる DB（テスト・デモ用）
    pub async fn in_memory() -> Result<Self, CatalogError> {
        Self::in_memory_with_clock(Arc::new(SystemClock)).await
    }

    pub async fn in_memory_with_clock(clock: Arc<dyn Clock>) -> Result<Self, CatalogError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| CatalogError::repository(format!("invalid SQLite url: {e}")))?
            .foreign_keys(true);

        // 接続が閉じると DB も消えるので、1 本を使い続ける
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| CatalogError::repository(format!("failed to connect to SQLite: {e}")))?;

        Self::from_pool(pool, clock).await
    }

    async fn from_pool(pool: SqlitePool, clock: Arc<dyn Clock>) -> Result<Self, CatalogError> {
        let catalog = Self {
            pool,
            ids: Arc::new(UlidGenerator::new(clock.clone())),
            clock,
        };
        catalog.run_migrations().await?;
        Ok(catalog)
    }

    async fn run_migrations(&self) -> Result<(), CatalogError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS products (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                sku TEXT NOT NULL UNIQUE,
                category_id TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                price TEXT NOT NULL,
                stock INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                main_image TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (category_id) REFERENCES categories(id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS product_images (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                product_id TEXT NOT NULL,
                color TEXT NOT NULL,
                path TEXT NOT NULL,
                alt_text TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE,
                UNIQUE(product_id, color)
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_product_images_product_seq
            ON product_images(product_id, seq)
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| CatalogError::repository(format!("migration failed: {e}")))?;
        }
        Ok(())
    }

    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?");
        sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(|row| product_from_row(&row))
            .transpose()
    }

    async fn fetch_product_by_sku(&self, sku: &str) -> Result<Option<Product>, CatalogError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?");
        sqlx::query(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(|row| product_from_row(&row))
            .transpose()
    }

    async fn fetch_category_by_name(&self, name: &str) -> Result<Option<Category>, CatalogError> {
        sqlx::query("SELECT id, name, description, created_at FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(|row| category_from_row(&row))
            .transpose()
    }

    async fn category_exists(&self, id: CategoryId) -> Result<bool, CatalogError> {
        let row = sqlx::query("SELECT 1 FROM categories WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn get_or_create_category(
        &self,
        name: &str,
        defaults: CategoryDefaults,
    ) -> Result<(Category, bool), CatalogError> {
        validate_category_name(name)?;

        let inserted = sqlx::query(
            "INSERT INTO categories (id, name, description, created_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(self.ids.generate_category_id().to_string())
        .bind(name)
        .bind(&defaults.description)
        .bind(encode_time(self.clock.now()))
        .execute(&self.pool)
        .await
        .map_err(db_error)?
        .rows_affected()
            == 1;

        let category = self
            .fetch_category_by_name(name)
            .await?
            .ok_or_else(|| CatalogError::not_found("category", name))?;
        Ok((category, inserted))
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category, CatalogError> {
        sqlx::query("SELECT id, name, description, created_at FROM categories WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(|row| category_from_row(&row))
            .transpose()?
            .ok_or_else(|| CatalogError::not_found("category", id))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        sqlx::query("SELECT id, name, description, created_at FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(category_from_row)
            .collect()
    }

    async fn get_or_create_product(
        &self,
        sku: &str,
        defaults: ProductDefaults,
    ) -> Result<(Product, bool), CatalogError> {
        validate_sku(sku)?;
        if let Some(existing) = self.fetch_product_by_sku(sku).await? {
            return Ok((existing, false));
        }

        defaults.validate()?;
        if !self.category_exists(defaults.category_id).await? {
            return Err(CatalogError::not_found("category", defaults.category_id));
        }

        let now = encode_time(self.clock.now());
        let inserted = sqlx::query(
            "INSERT INTO products (id, name, sku, category_id, description, price, stock, \
             is_active, main_image, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?) \
             ON CONFLICT(sku) DO NOTHING",
        )
        .bind(self.ids.generate_product_id().to_string())
        .bind(&defaults.name)
        .bind(sku)
        .bind(defaults.category_id.to_string())
        .bind(&defaults.description)
        .bind(defaults.price.to_string())
        .bind(i64::from(defaults.stock))
        .bind(defaults.is_active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                CatalogError::not_found("category", defaults.category_id)
            } else {
                db_error(e)
            }
        })?
        .rows_affected()
            == 1;

        let product = self
            .fetch_product_by_sku(sku)
            .await?
            .ok_or_else(|| CatalogError::not_found("product", sku))?;
        Ok((product, inserted))
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.fetch_product(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("product", id))
    }

    async fn find_product_by_sku(&self, sku: &str) -> Result<Option<Product>, CatalogError> {
        self.fetch_product_by_sku(sku).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY seq");
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(product_from_row)
            .collect()
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, CatalogError> {
        changes.validate()?;
        let mut product = self.get_product(id).await?;
        changes.apply(&mut product);
        product.updated_at = self.clock.now();

        let updated = sqlx::query(
            "UPDATE products SET name = ?, description = ?, price = ?, stock = ?, \
             is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.to_string())
        .bind(i64::from(product.stock))
        .bind(product.is_active)
        .bind(encode_time(product.updated_at))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if updated.rows_affected() == 0 {
            return Err(CatalogError::not_found("product", id));
        }
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let deleted = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if deleted.rows_affected() == 0 {
            return Err(CatalogError::not_found("product", id));
        }
        Ok(())
    }

    async fn set_main_image(
        &self,
        id: ProductId,
        path: Option<StoredPath>,
    ) -> Result<Product, CatalogError> {
        let updated = sqlx::query("UPDATE products SET main_image = ?, updated_at = ? WHERE id = ?")
            .bind(path.as_ref().map(|p| p.as_str().to_string()))
            .bind(encode_time(self.clock.now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if updated.rows_affected() == 0 {
            return Err(CatalogError::not_found("product", id));
        }
        self.get_product(id).await
    }

    async fn set_main_image_if_unset(
        &self,
        id: ProductId,
        path: &StoredPath,
    ) -> Result<bool, CatalogError> {
        let updated = sqlx::query(
            "UPDATE products SET main_image = ?, updated_at = ? \
             WHERE id = ? AND main_image IS NULL",
        )
        .bind(path.as_str())
        .bind(encode_time(self.clock.now()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if updated.rows_affected() == 1 {
            return Ok(true);
        }
        // 0 行: 既に設定済みか、商品が無い
        self.get_product(id).await.map(|_| false)
    }
}

#[async_trait]
impl VariantRepository for SqliteCatalog {
    async fn create(
        &self,
        product_id: ProductId,
        color: &Color,
        path: &StoredPath,
        alt_text: Option<&str>,
    ) -> Result<ProductImage, CatalogError> {
        let variant = ProductImage {
            id: self.ids.generate_variant_id(),
            product_id,
            color: color.clone(),
            path: path.clone(),
            alt_text: normalize_alt_text(alt_text),
            created_at: self.clock.now(),
        };

        sqlx::query(
            "INSERT INTO product_images (id, product_id, color, path, alt_text, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(variant.id.to_string())
        .bind(product_id.to_string())
        .bind(color.as_str())
        .bind(path.as_str())
        .bind(variant.alt_text.as_deref())
        .bind(encode_time(variant.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CatalogError::DuplicateVariant {
                    product_id,
                    color: color.as_str().to_string(),
                }
            } else if is_foreign_key_violation(&e) {
                CatalogError::not_found("product", product_id)
            } else {
                db_error(e)
            }
        })?;

        Ok(variant)
    }

    async fn list_by_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, CatalogError> {
        let sql =
            format!("SELECT {VARIANT_COLUMNS} FROM product_images WHERE product_id = ? ORDER BY seq");
        sqlx::query(&sql)
            .bind(product_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(variant_from_row)
            .collect()
    }

    async fn get(&self, id: VariantId) -> Result<ProductImage, CatalogError> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM product_images WHERE id = ?");
        sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(|row| variant_from_row(&row))
            .transpose()?
            .ok_or_else(|| CatalogError::not_found("variant", id))
    }

    async fn delete(&self, id: VariantId) -> Result<ProductImage, CatalogError> {
        let sql = format!("DELETE FROM product_images WHERE id = ? RETURNING {VARIANT_COLUMNS}");
        sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(|row| variant_from_row(&row))
            .transpose()?
            .ok_or_else(|| CatalogError::not_found("variant", id))
    }

    async fn delete_all_for_product(&self, product_id: ProductId) -> Result<usize, CatalogError> {
        let deleted = sqlx::query("DELETE FROM product_images WHERE product_id = ?")
            .bind(product_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(deleted.rows_affected() as usize)
    }
}

fn db_error(e: sqlx::Error) -> CatalogError {
    CatalogError::repository(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

fn decode_time(value: &str) -> Result<DateTime<Utc>, CatalogError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CatalogError::repository(format!("bad timestamp '{value}': {e}")))
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, CatalogError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| CatalogError::repository(format!("column '{name}': {e}")))
}

fn parse_id<T>(value: &str) -> Result<T, CatalogError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| CatalogError::repository(format!("bad id '{value}': {e}")))
}

fn category_from_row(row: &SqliteRow) -> Result<Category, CatalogError> {
    Ok(Category {
        id: parse_id(&column::<String>(row, "id")?)?,
        name: column(row, "name")?,
        description: column(row, "description")?,
        created_at: decode_time(&column::<String>(row, "created_at")?)?,
    })
}

fn product_from_row(row: &SqliteRow) -> Result<Product, CatalogError> {
    let price: String = column(row, "price")?;
    let stock: i64 = column(row, "stock")?;
    Ok(Product {
        id: parse_id(&column::<String>(row, "id")?)?,
        name: column(row, "name")?,
        sku: column(row, "sku")?,
        category_id: parse_id(&column::<String>(row, "category_id")?)?,
        description: column(row, "description")?,
        price: Decimal::from_str(&price)
            .map_err(|e| CatalogError::repository(format!("bad price '{price}': {e}")))?,
        stock: u32::try_from(stock)
            .map_err(|_| CatalogError::repository(format!("bad stock {stock}")))?,
        is_active: column(row, "is_active")?,
        main_image: column::<Option<String>>(row, "main_image")?.map(StoredPath::new),
        created_at: decode_time(&column::<String>(row, "created_at")?)?,
        updated_at: decode_time(&column::<String>(row, "updated_at")?)?,
    })
}

fn variant_from_row(row: &SqliteRow) -> Result<ProductImage, CatalogError> {
    Ok(ProductImage {
        id: parse_id(&column::<String>(row, "id")?)?,
        product_id: parse_id(&column::<String>(row, "product_id")?)?,
        color: Color::new(column::<String>(row, "color")?)?,
        path: StoredPath::new(column::<String>(row, "path")?),
        alt_text: column(row, "alt_text")?,
        created_at: decode_time(&column::<String>(row, "created_at")?)?,
    })
}
