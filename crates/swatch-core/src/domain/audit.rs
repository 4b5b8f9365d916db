//! Audit report: the shape of a drift scan across catalog, variants and storage.
//!
//! This module only describes results; producing them is
//! `app::auditor::ConsistencyAuditor`'s job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ProductId, VariantId};
use super::stored_file::StoredPath;
use super::variant::Color;

/// One drift finding.
///
/// Serialized as `{"kind": "missing_main_image_file", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// `main_image` is set but the file is not in storage.
    MissingMainImageFile { product_id: ProductId, path: StoredPath },

    /// The product has variants but no main image.
    MainImageUnset { product_id: ProductId, variant_count: usize },

    /// A variant row whose backing file is gone.
    MissingVariantFile {
        product_id: ProductId,
        variant_id: VariantId,
        path: StoredPath,
    },

    /// A stored file that no variant and no main image references
    /// (typically left behind by a partial write or a deleted product).
    UnreferencedFile { path: StoredPath },
}

impl Finding {
    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            Finding::MissingMainImageFile { product_id, .. }
            | Finding::MainImageUnset { product_id, .. }
            | Finding::MissingVariantFile { product_id, .. } => Some(*product_id),
            Finding::UnreferencedFile { .. } => None,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::MissingMainImageFile { product_id, path } => {
                write!(f, "{product_id}: main image file missing ({path})")
            }
            Finding::MainImageUnset {
                product_id,
                variant_count,
            } => write!(f, "{product_id}: {variant_count} variant(s) but no main image"),
            Finding::MissingVariantFile {
                product_id,
                variant_id,
                path,
            } => write!(f, "{product_id}: variant {variant_id} file missing ({path})"),
            Finding::UnreferencedFile { path } => write!(f, "unreferenced file {path}"),
        }
    }
}

/// Per-variant audit line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAudit {
    pub variant_id: VariantId,
    pub color: Color,
    pub path: StoredPath,
    pub file_exists: bool,
}

/// Per-product audit section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAudit {
    pub product_id: ProductId,
    pub sku: String,
    pub main_image: Option<StoredPath>,
    /// `None` when no main image is set.
    pub main_image_exists: Option<bool>,
    pub variant_count: usize,
    pub variants: Vec<VariantAudit>,
}

impl ProductAudit {
    /// Findings that follow from this section alone.
    pub fn findings(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        match (&self.main_image, self.main_image_exists) {
            (Some(path), Some(false)) => findings.push(Finding::MissingMainImageFile {
                product_id: self.product_id,
                path: path.clone(),
            }),
            (None, _) if self.variant_count > 0 => findings.push(Finding::MainImageUnset {
                product_id: self.product_id,
                variant_count: self.variant_count,
            }),
            _ => {}
        }
        for variant in self.variants.iter().filter(|v| !v.file_exists) {
            findings.push(Finding::MissingVariantFile {
                product_id: self.product_id,
                variant_id: variant.variant_id,
                path: variant.path.clone(),
            });
        }
        findings
    }
}

/// Summary counts, one per finding kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCounts {
    pub products: usize,
    pub variants: usize,
    pub missing_main_image_files: usize,
    pub unset_main_images: usize,
    pub missing_variant_files: usize,
    pub unreferenced_files: usize,
}

impl AuditCounts {
    pub fn drift_total(&self) -> usize {
        self.missing_main_image_files
            + self.unset_main_images
            + self.missing_variant_files
            + self.unreferenced_files
    }
}

/// Full drift scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub products: Vec<ProductAudit>,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn findings_for(&self, product_id: ProductId) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|finding| finding.product_id() == Some(product_id))
            .collect()
    }

    pub fn product(&self, product_id: ProductId) -> Option<&ProductAudit> {
        self.products.iter().find(|p| p.product_id == product_id)
    }

    pub fn counts(&self) -> AuditCounts {
        let mut counts = AuditCounts {
            products: self.products.len(),
            variants: self.products.iter().map(|p| p.variant_count).sum(),
            ..AuditCounts::default()
        };
        for finding in &self.findings {
            match finding {
                Finding::MissingMainImageFile { .. } => counts.missing_main_image_files += 1,
                Finding::MainImageUnset { .. } => counts.unset_main_images += 1,
                Finding::MissingVariantFile { .. } => counts.missing_variant_files += 1,
                Finding::UnreferencedFile { .. } => counts.unreferenced_files += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn section(main_image: Option<&str>, main_exists: Option<bool>, files: &[bool]) -> ProductAudit {
        let product_id = ProductId::from_ulid(Ulid::new());
        let variants: Vec<VariantAudit> = files
            .iter()
            .enumerate()
            .map(|(i, exists)| VariantAudit {
                variant_id: VariantId::from_ulid(Ulid::new()),
                color: Color::new(format!("c{i}")).unwrap(),
                path: StoredPath::new(format!("products/{product_id}/c{i}.jpg")),
                file_exists: *exists,
            })
            .collect();
        ProductAudit {
            product_id,
            sku: "SKU".into(),
            main_image: main_image.map(StoredPath::from),
            main_image_exists: main_exists,
            variant_count: variants.len(),
            variants,
        }
    }

    #[test]
    fn healthy_product_has_no_findings() {
        assert!(section(Some("a.jpg"), Some(true), &[true, true]).findings().is_empty());
        assert!(section(None, None, &[]).findings().is_empty());
    }

    #[test]
    fn unset_main_with_variants_is_reported() {
        let findings = section(None, None, &[true]).findings();
        assert!(matches!(
            findings.as_slice(),
            [Finding::MainImageUnset { variant_count: 1, .. }]
        ));
    }

    #[test]
    fn missing_files_are_reported_separately() {
        let findings = section(Some("gone.jpg"), Some(false), &[true, false]).findings();
        assert_eq!(findings.len(), 2);
        assert!(matches!(findings[0], Finding::MissingMainImageFile { .. }));
        assert!(matches!(findings[1], Finding::MissingVariantFile { .. }));
    }

    #[test]
    fn counts_and_serialized_shape() {
        let audit = section(Some("gone.jpg"), Some(false), &[false]);
        let product_id = audit.product_id;
        let mut findings = audit.findings();
        findings.push(Finding::UnreferencedFile {
            path: StoredPath::new("products/orphan.jpg"),
        });
        let report = AuditReport {
            generated_at: Utc::now(),
            products: vec![audit],
            findings,
        };

        let counts = report.counts();
        assert_eq!(counts.products, 1);
        assert_eq!(counts.variants, 1);
        assert_eq!(counts.missing_main_image_files, 1);
        assert_eq!(counts.missing_variant_files, 1);
        assert_eq!(counts.unreferenced_files, 1);
        assert_eq!(counts.drift_total(), 3);
        assert_eq!(report.findings_for(product_id).len(), 2);

        let json = serde_json::to_value(&report.findings[0]).unwrap();
        assert_eq!(json["kind"], "missing_main_image_file");
        assert_eq!(json["path"], "gone.jpg");
    }
}
