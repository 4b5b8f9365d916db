//! デモ用カタログの投入
//!
//! "Office Chairs" カテゴリに 3 商品と色違いの画像を作ります。
//! 画像は色で塗った SVG スウォッチです。何度実行しても結果は同じで、
//! 既にある商品・色はそのまま残します。

use bytes::Bytes;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::app::{App, UploadRequest};
use crate::domain::{CatalogError, CategoryDefaults, Credential, ProductDefaults, ProductId};
use crate::ports::CatalogStore;

const SWATCH_CONTENT_TYPE: &str = "image/svg+xml";

struct DemoProduct {
    name: &'static str,
    sku: &'static str,
    /// cents
    price: i64,
    description: &'static str,
    stock: u32,
    colors: &'static [&'static str],
}

const CATEGORY: (&str, &str) = ("Office Chairs", "Comfortable office chairs");

const PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        name: "Ergonomic Office Chair",
        sku: "CHAIR-001",
        price: 59999,
        description: "Premium ergonomic office chair with lumbar support",
        stock: 10,
        colors: &["Black", "Gray", "Blue"],
    },
    DemoProduct {
        name: "Executive Desk",
        sku: "DESK-001",
        price: 129999,
        description: "Large executive desk with storage",
        stock: 5,
        colors: &["Brown", "Walnut"],
    },
    DemoProduct {
        name: "Conference Table",
        sku: "TABLE-001",
        price: 249999,
        description: "Professional conference table for 8-10 people",
        stock: 3,
        colors: &["White", "Black"],
    },
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub products_created: usize,
    pub variants_created: usize,
    pub variants_skipped: usize,
    pub products: Vec<ProductId>,
}

/// デモカタログを投入する
pub async fn seed_demo_catalog(
    app: &App,
    credential: &Credential,
) -> Result<SeedSummary, CatalogError> {
    let (name, description) = CATEGORY;
    let (category, _) = app
        .catalog
        .get_or_create_category(name, CategoryDefaults::with_description(description))
        .await?;

    let mut summary = SeedSummary::default();
    for demo in PRODUCTS {
        let defaults = ProductDefaults::new(demo.name, category.id, Decimal::new(demo.price, 2))
            .with_description(demo.description)
            .with_stock(demo.stock);
        let (product, created) = app.catalog.get_or_create_product(demo.sku, defaults).await?;
        if created {
            summary.products_created += 1;
        }
        summary.products.push(product.id);

        for color in demo.colors {
            let request = UploadRequest::new(
                product.id,
                *color,
                swatch_svg(color),
                SWATCH_CONTENT_TYPE,
                credential.clone(),
            )
            .with_alt_text(format!("{} in {color}", demo.name));

            match app.upload.upload(request).await {
                Ok(_) => summary.variants_created += 1,
                Err(CatalogError::DuplicateVariant { .. }) => summary.variants_skipped += 1,
                Err(e) => return Err(e),
            }
        }
    }

    tracing::info!(
        products_created = summary.products_created,
        variants_created = summary.variants_created,
        variants_skipped = summary.variants_skipped,
        "demo catalog seeded"
    );
    Ok(summary)
}

fn swatch_rgb(color: &str) -> (u8, u8, u8) {
    match color {
        "Black" => (0, 0, 0),
        "Gray" => (128, 128, 128),
        "Blue" => (0, 0, 255),
        "Brown" => (139, 69, 19),
        "Walnut" => (101, 67, 33),
        "White" => (255, 255, 255),
        _ => (100, 100, 100),
    }
}

fn swatch_svg(color: &str) -> Bytes {
    let (r, g, b) = swatch_rgb(color);
    Bytes::from(format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"300\" height=\"300\">\
         <rect width=\"300\" height=\"300\" fill=\"#{r:02x}{g:02x}{b:02x}\"/></svg>"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppBuilder;
    use crate::domain::Principal;
    use crate::impls::{InMemoryCatalog, InMemoryStorage, StaticTokenAuthorizer};
    use crate::ports::VariantRepository;
    use std::sync::Arc;

    fn app() -> App {
        AppBuilder::new()
            .with_database(Arc::new(InMemoryCatalog::new()))
            .with_storage(Arc::new(InMemoryStorage::new()))
            .with_authorizer(Arc::new(
                StaticTokenAuthorizer::new().with_token("t", Principal::staff("admin")),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_swatch_is_colored() {
        let svg = swatch_svg("Brown");
        assert!(std::str::from_utf8(&svg).unwrap().contains("fill=\"#8b4513\""));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let app = app();
        let credential = Credential::bearer("t");

        let first = seed_demo_catalog(&app, &credential).await.unwrap();
        assert_eq!(first.products_created, 3);
        assert_eq!(first.variants_created, 7);

        let second = seed_demo_catalog(&app, &credential).await.unwrap();
        assert_eq!(second.products_created, 0);
        assert_eq!(second.variants_created, 0);
        assert_eq!(second.variants_skipped, 7);
        assert_eq!(first.products, second.products);

        let report = app.auditor.audit().await.unwrap();
        assert!(report.is_clean(), "{:?}", report.findings);
        let chair = app.catalog.find_product_by_sku("CHAIR-001").await.unwrap().unwrap();
        let variants = app.variants.list_by_product(chair.id).await.unwrap();
        assert_eq!(chair.main_image, Some(variants[0].path.clone()));
        assert_eq!(variants[0].color.as_str(), "Black");
    }

    #[tokio::test]
    async fn test_seed_requires_staff() {
        let app = app();
        let err = seed_demo_catalog(&app, &Credential::bearer("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Unauthorized(_)));
    }
}
