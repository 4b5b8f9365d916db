//! Per-color product image records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::CatalogError;
use super::ids::{ProductId, VariantId};
use super::stored_file::StoredPath;

/// Color label of a variant.
///
/// Compared case-sensitively and stored exactly as given: "Black" and
/// "black" are two different variants. A label made only of whitespace is
/// rejected as empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub fn new(label: impl Into<String>) -> Result<Self, CatalogError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(CatalogError::validation("color", "must not be empty"));
        }
        Ok(Self(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Color {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.0
    }
}

/// ProductImage: one color variant of a product.
///
/// Identity is `(product_id, color)`. Records are never updated; changing
/// the color or file means deleting and uploading again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: VariantId,
    pub product_id: ProductId,
    pub color: Color,
    pub path: StoredPath,
    pub alt_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Normalises optional alt text: blank strings become `None`.
pub fn normalize_alt_text(alt_text: Option<&str>) -> Option<String> {
    alt_text
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
