//! Domain model (IDs, catalog entities, variants, stored paths, audit results, ...).
//!
//! ここには I/O を持たない型とルールだけを置きます。
//! ストアやストレージへのアクセスは ports / impls の責務です。

pub mod audit;
pub mod catalog;
pub mod credential;
pub mod errors;
pub mod ids;
pub mod policy;
pub mod stored_file;
pub mod variant;

pub use audit::{AuditCounts, AuditReport, Finding, ProductAudit, VariantAudit};
pub use catalog::{Category, CategoryDefaults, Product, ProductChanges, ProductDefaults};
pub use credential::{Credential, Principal};
pub use errors::{CatalogError, ErrorKind, StorageError};
pub use ids::{CategoryId, IdParseError, ProductId, VariantId};
pub use policy::{
    CallerDesignated, FirstVariantWins, MainImageContext, MainImageDecision, MainImagePolicy,
};
pub use stored_file::{MEDIA_PREFIX, StoredPath};
pub use variant::{Color, ProductImage};
