//! swatch - 商品画像バリアントの管理 CLI
//!
//! ```bash
//! swatch seed --token dev-admin-token
//! swatch variant upload CHAIR-001 --color Black --file black.jpg
//! swatch audit --json --fail-on-drift
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use swatch_core::app::{App, AppBuilder, UploadRequest, seed_demo_catalog};
use swatch_core::config::Settings;
use swatch_core::domain::stored_file::content_type_for_extension;
use swatch_core::domain::{
    AuditReport, CallerDesignated, CategoryDefaults, Credential, Product, ProductChanges,
    ProductDefaults, ProductId, StoredPath, VariantId,
};
use swatch_core::ports::{CatalogStore, VariantRepository};

#[derive(Parser)]
#[command(name = "swatch")]
#[command(about = "Product image variant storage", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to config/swatch.* if present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Bearer token for catalog admin actions
    #[arg(long, global = true, env = "SWATCH_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },

    /// Manage products
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },

    /// Manage color variant images
    Variant {
        #[command(subcommand)]
        command: VariantCommands,
    },

    /// Report drift between the catalog and file storage
    Audit {
        /// Only audit one product (id or sku)
        #[arg(long, value_name = "PRODUCT")]
        product: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Exit with status 2 when any finding is reported
        #[arg(long)]
        fail_on_drift: bool,
    },

    /// Create the demo catalog (safe to re-run)
    Seed,
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Get or create a category by name
    Create {
        name: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List categories by name
    List,
}

#[derive(Subcommand)]
enum ProductCommands {
    /// Get or create a product by SKU
    Create {
        #[arg(long)]
        sku: String,

        #[arg(long)]
        name: String,

        /// Category name (created if missing)
        #[arg(long)]
        category: String,

        #[arg(long)]
        price: Decimal,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value_t = 0)]
        stock: u32,

        #[arg(long)]
        inactive: bool,
    },

    /// List products in creation order
    List,

    /// Show a product with its variants
    Show {
        /// Product id or sku
        product: String,
    },

    /// Update product fields
    Update {
        /// Product id or sku
        product: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        price: Option<Decimal>,

        #[arg(long)]
        stock: Option<u32>,

        #[arg(long)]
        active: Option<bool>,
    },

    /// Point the main image at a stored path (no existence check)
    SetMain {
        /// Product id or sku
        product: String,

        /// Stored path; omit together with --clear to unset
        #[arg(required_unless_present = "clear")]
        path: Option<String>,

        #[arg(long, conflicts_with = "path")]
        clear: bool,
    },

    /// Delete a product and its variant records (files are kept)
    Delete {
        /// Product id or sku
        product: String,
    },
}

#[derive(Subcommand)]
enum VariantCommands {
    /// Upload a color variant image
    Upload {
        /// Product id or sku
        product: String,

        #[arg(long)]
        color: String,

        #[arg(long, value_name = "PATH")]
        file: PathBuf,

        /// Defaults to the type implied by the file extension
        #[arg(long)]
        content_type: Option<String>,

        #[arg(long)]
        alt_text: Option<String>,

        /// Make this upload the main image even if one is set
        #[arg(long)]
        make_main: bool,
    },

    /// List a product's variants in creation order
    List {
        /// Product id or sku
        product: String,
    },

    /// Delete a variant (its file is removed when nothing else uses it)
    Delete { variant: VariantId },
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&settings.log.filter);
    tracing::debug!(config = ?cli.config, media_root = %settings.storage.root.display(), "settings loaded");

    let make_main = matches!(
        &cli.command,
        Commands::Variant {
            command: VariantCommands::Upload { make_main: true, .. }
        }
    );
    let mut builder = AppBuilder::from_settings(&settings).await?;
    if make_main {
        builder = builder.with_main_image_policy(Arc::new(CallerDesignated));
    }
    let app = builder.build()?;
    let credential = Credential::bearer(cli.token.unwrap_or_default());

    match cli.command {
        Commands::Category { command } => run_category(&app, command).await?,
        Commands::Product { command } => run_product(&app, command).await?,
        Commands::Variant { command } => run_variant(&app, &credential, command).await?,
        Commands::Audit {
            product,
            json,
            fail_on_drift,
        } => {
            let report = match product {
                Some(reference) => {
                    let product = resolve_product(&app, &reference).await?;
                    app.auditor.audit_product(product.id).await?
                }
                None => app.auditor.audit().await?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            if fail_on_drift && !report.is_clean() {
                return Ok(ExitCode::from(2));
            }
        }
        Commands::Seed => {
            let summary = seed_demo_catalog(&app, &credential).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_category(app: &App, command: CategoryCommands) -> Result<()> {
    match command {
        CategoryCommands::Create { name, description } => {
            let (category, created) = app
                .catalog
                .get_or_create_category(&name, CategoryDefaults::with_description(description))
                .await?;
            println!("{} {} (created: {created})", category.id, category.name);
        }
        CategoryCommands::List => {
            for category in app.catalog.list_categories().await? {
                println!("{}\t{}\t{}", category.id, category.name, category.description);
            }
        }
    }
    Ok(())
}

async fn run_product(app: &App, command: ProductCommands) -> Result<()> {
    match command {
        ProductCommands::Create {
            sku,
            name,
            category,
            price,
            description,
            stock,
            inactive,
        } => {
            let (category, _) = app
                .catalog
                .get_or_create_category(&category, CategoryDefaults::default())
                .await?;
            let mut defaults = ProductDefaults::new(name, category.id, price)
                .with_description(description)
                .with_stock(stock);
            if inactive {
                defaults = defaults.inactive();
            }
            let (product, created) = app.catalog.get_or_create_product(&sku, defaults).await?;
            println!("{} {} (created: {created})", product.id, product.sku);
        }
        ProductCommands::List => {
            for product in app.catalog.list_products().await? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    product.id,
                    product.sku,
                    product.name,
                    product.price,
                    product.main_image.as_ref().map_or("-", StoredPath::as_str)
                );
            }
        }
        ProductCommands::Show { product } => {
            let product = resolve_product(app, &product).await?;
            let variants = app.variants.list_by_product(product.id).await?;
            println!("{}", serde_json::to_string_pretty(&product)?);
            println!("variants ({}):", variants.len());
            for variant in variants {
                println!("  {}\t{}\t{}", variant.id, variant.color, variant.path);
            }
        }
        ProductCommands::Update {
            product,
            name,
            description,
            price,
            stock,
            active,
        } => {
            let product = resolve_product(app, &product).await?;
            let changes = ProductChanges {
                name,
                description,
                price,
                stock,
                is_active: active,
            };
            let updated = app.catalog.update_product(product.id, changes).await?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        ProductCommands::SetMain {
            product,
            path,
            clear,
        } => {
            let product = resolve_product(app, &product).await?;
            let path = if clear { None } else { path.map(StoredPath::new) };
            let updated = app.catalog.set_main_image(product.id, path).await?;
            println!(
                "{} main image: {}",
                updated.sku,
                updated.main_image.as_ref().map_or("-", StoredPath::as_str)
            );
        }
        ProductCommands::Delete { product } => {
            let product = resolve_product(app, &product).await?;
            app.catalog.delete_product(product.id).await?;
            println!("deleted {} ({})", product.id, product.sku);
        }
    }
    Ok(())
}

async fn run_variant(app: &App, credential: &Credential, command: VariantCommands) -> Result<()> {
    match command {
        VariantCommands::Upload {
            product,
            color,
            file,
            content_type,
            alt_text,
            make_main,
        } => {
            let product = resolve_product(app, &product).await?;
            let content_type = match content_type {
                Some(content_type) => content_type,
                None => guess_content_type(&file)?,
            };
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;

            let mut request = UploadRequest::new(product.id, color, bytes, content_type, credential.clone());
            request.alt_text = alt_text;
            request.make_main = make_main;
            let uploaded = app.upload.upload(request).await?;
            println!("{}", serde_json::to_string_pretty(&uploaded)?);
        }
        VariantCommands::List { product } => {
            let product = resolve_product(app, &product).await?;
            for variant in app.variants.list_by_product(product.id).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    variant.id,
                    variant.color,
                    variant.path,
                    variant.alt_text.as_deref().unwrap_or("")
                );
            }
        }
        VariantCommands::Delete { variant } => {
            let deleted = app.upload.delete_variant(credential, variant).await?;
            println!("{}", serde_json::to_string_pretty(&deleted)?);
        }
    }
    Ok(())
}

/// `prod-...` ならID、それ以外は SKU として探す
async fn resolve_product(app: &App, reference: &str) -> Result<Product> {
    if let Ok(id) = reference.parse::<ProductId>() {
        return Ok(app.catalog.get_product(id).await?);
    }
    match app.catalog.find_product_by_sku(reference).await? {
        Some(product) => Ok(product),
        None => bail!("no product with id or sku '{reference}'"),
    }
}

fn guess_content_type(file: &std::path::Path) -> Result<String> {
    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .context("file has no extension; pass --content-type")?;
    content_type_for_extension(extension)
        .map(str::to_string)
        .with_context(|| format!("unknown image extension '.{extension}'; pass --content-type"))
}

fn print_report(report: &AuditReport) {
    for section in &report.products {
        let main = match (&section.main_image, section.main_image_exists) {
            (Some(path), Some(true)) => format!("{path} (ok)"),
            (Some(path), _) => format!("{path} (MISSING)"),
            (None, _) => "-".to_string(),
        };
        println!("{} [{}] main: {main}", section.sku, section.product_id);
        for variant in &section.variants {
            let status = if variant.file_exists { "ok" } else { "MISSING" };
            println!("  {}\t{}\t{status}", variant.color, variant.path);
        }
    }

    let counts = report.counts();
    println!();
    println!(
        "{} product(s), {} variant(s), {} finding(s)",
        counts.products,
        counts.variants,
        counts.drift_total()
    );
    for finding in &report.findings {
        println!("  - {finding}");
    }
}
