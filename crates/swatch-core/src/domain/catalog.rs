//! Catalog entities: categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::CatalogError;
use super::ids::{CategoryId, ProductId};
use super::stored_file::StoredPath;

/// Category record. Created through get-or-create by name, never deleted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Fields used when `get_or_create_category` has to insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDefaults {
    pub description: String,
}

impl CategoryDefaults {
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// Product record.
///
/// `main_image` is a loose pointer into the storage backend. It is not tied
/// to any variant row and nothing checks that the file exists when it is
/// set; the consistency auditor reports when it does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub category_id: CategoryId,
    pub description: String,
    pub price: Decimal,
    pub stock: u32,
    pub is_active: bool,
    pub main_image: Option<StoredPath>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields used when `get_or_create_product` has to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDefaults {
    pub name: String,
    pub category_id: CategoryId,
    pub description: String,
    pub price: Decimal,
    pub stock: u32,
    pub is_active: bool,
}

impl ProductDefaults {
    pub fn new(name: impl Into<String>, category_id: CategoryId, price: Decimal) -> Self {
        Self {
            name: name.into(),
            category_id,
            description: String::new(),
            price,
            stock: 0,
            is_active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Checks everything that does not need the store (the category
    /// reference is checked by the store itself).
    pub fn validate(&self) -> Result<(), CatalogError> {
        validate_price(self.price)
    }
}

/// Partial update of a product. `None` leaves the field unchanged.
///
/// The main image is not part of this: it only moves through
/// `set_main_image` and the upload pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub is_active: Option<bool>,
}

impl ProductChanges {
    pub fn validate(&self) -> Result<(), CatalogError> {
        match self.price {
            Some(price) => validate_price(price),
            None => Ok(()),
        }
    }

    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
    }
}

pub fn validate_category_name(name: &str) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::validation("category name", "must not be empty"));
    }
    Ok(())
}

pub fn validate_sku(sku: &str) -> Result<(), CatalogError> {
    if sku.trim().is_empty() {
        return Err(CatalogError::validation("sku", "must not be empty"));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), CatalogError> {
    if price < Decimal::ZERO {
        return Err(CatalogError::validation(
            "price",
            format!("must not be negative (got {price})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ulid::Ulid;

    fn category_id() -> CategoryId {
        CategoryId::from_ulid(Ulid::new())
    }

    #[rstest]
    #[case::zero(Decimal::ZERO, true)]
    #[case::positive(Decimal::new(59999, 2), true)]
    #[case::negative(Decimal::new(-1, 2), false)]
    fn product_price_must_not_be_negative(#[case] price: Decimal, #[case] ok: bool) {
        let defaults = ProductDefaults::new("Chair", category_id(), price);
        assert_eq!(defaults.validate().is_ok(), ok);
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(validate_category_name("  ").is_err());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("CHAIR-001").is_ok());
    }

    #[test]
    fn changes_apply_only_given_fields() {
        let now = Utc::now();
        let mut product = Product {
            id: ProductId::from_ulid(Ulid::new()),
            name: "Chair".into(),
            sku: "CHAIR-001".into(),
            category_id: category_id(),
            description: "old".into(),
            price: Decimal::new(100, 0),
            stock: 3,
            is_active: true,
            main_image: Some(StoredPath::new("products/x/black_1.jpg")),
            created_at: now,
            updated_at: now,
        };

        ProductChanges {
            stock: Some(10),
            is_active: Some(false),
            ..Default::default()
        }
        .apply(&mut product);

        assert_eq!(product.stock, 10);
        assert!(!product.is_active);
        assert_eq!(product.description, "old");
        assert_eq!(product.main_image.as_ref().map(StoredPath::as_str), Some("products/x/black_1.jpg"));
    }
}
