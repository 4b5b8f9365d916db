//! Stored file paths and the naming rules shared by every storage backend.
//!
//! A variant file lives at
//! `products/<product-id>/<color-slug>_<discriminator>.<ext>`:
//! the prefix is re-derivable from the product id (so the auditor can scan
//! it), and the discriminator keeps two uploads of the same logical name
//! from ever landing on the same key.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

use super::ids::ProductId;
use super::variant::Color;

/// Top-level namespace for every file this subsystem writes.
pub const MEDIA_PREFIX: &str = "products";

/// Opaque key of a file in the storage backend.
///
/// Paths are relative to the media root and always use `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredPath(String);

impl StoredPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StoredPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoredPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Maps an image content type to the file extension used on disk.
///
/// Returns `None` for anything that is not an image type we accept.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/avif" => Some("avif"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    }
}

/// Inverse of [`extension_for`], used when a caller only has a file name.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "avif" => Some("image/avif"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Lowercase ASCII slug of a color label, safe to use as a file stem.
///
/// "Dark Gray" -> "dark-gray", "Ñandú" -> "and". Labels with no usable
/// characters fall back to "variant"; the discriminator keeps them unique.
pub fn color_slug(color: &Color) -> String {
    let mut slug = String::with_capacity(color.as_str().len());
    let mut pending_dash = false;
    for ch in color.as_str().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("variant");
    }
    slug
}

/// Prefix under which every file of `product_id` is stored.
pub fn product_prefix(product_id: ProductId) -> String {
    format!("{MEDIA_PREFIX}/{product_id}/")
}

/// Logical (pre-discriminator) name of a variant upload.
pub fn variant_logical_name(product_id: ProductId, color: &Color, extension: &str) -> String {
    format!("{}{}.{extension}", product_prefix(product_id), color_slug(color))
}

/// A fresh discriminator: a lowercase ULID, sortable by write time.
pub fn fresh_discriminator() -> String {
    Ulid::new().to_string().to_ascii_lowercase()
}

/// Inserts `_<discriminator>` between the file stem and its extension.
///
/// `products/p/black.jpg` + `01hx` -> `products/p/black_01hx.jpg`
pub fn discriminated_path(logical_name: &str, discriminator: &str) -> StoredPath {
    let (dir, file) = match logical_name.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, logical_name),
    };
    let file = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{discriminator}.{ext}"),
        _ => format!("{file}_{discriminator}"),
    };
    match dir {
        Some(dir) => StoredPath::new(format!("{dir}/{file}")),
        None => StoredPath::new(file),
    }
}

/// Rejects names that could escape the media root or are not portable keys.
pub fn validate_storage_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    if name.starts_with('/') {
        return Err("name must be relative".to_string());
    }
    if name.contains('\\') {
        return Err("backslashes are not allowed".to_string());
    }
    if name.contains('\0') {
        return Err("NUL bytes are not allowed".to_string());
    }
    if name
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err("empty, '.' or '..' segments are not allowed".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("image/jpeg", Some("jpg"))]
    #[case("image/JPEG; charset=binary", Some("jpg"))]
    #[case("image/png", Some("png"))]
    #[case("image/svg+xml", Some("svg"))]
    #[case("application/pdf", None)]
    #[case("", None)]
    fn extension_follows_content_type(#[case] content_type: &str, #[case] expected: Option<&str>) {
        assert_eq!(extension_for(content_type), expected);
    }

    #[rstest]
    #[case("Black", "black")]
    #[case("Dark  Gray", "dark-gray")]
    #[case("  Walnut / Oak ", "walnut-oak")]
    #[case("???", "variant")]
    fn color_slugs(#[case] label: &str, #[case] expected: &str) {
        let color = Color::new(label).unwrap();
        assert_eq!(color_slug(&color), expected);
    }

    #[test]
    fn discriminator_goes_before_extension() {
        let path = discriminated_path("products/prod-1/black.jpg", "abc");
        assert_eq!(path.as_str(), "products/prod-1/black_abc.jpg");
    }

    #[test]
    fn discriminator_without_extension_or_directory() {
        assert_eq!(discriminated_path("black", "abc").as_str(), "black_abc");
        assert_eq!(discriminated_path(".hidden", "abc").as_str(), ".hidden_abc");
    }

    #[test]
    fn fresh_discriminators_differ() {
        assert_ne!(fresh_discriminator(), fresh_discriminator());
    }

    #[test]
    fn logical_name_is_namespaced_by_product() {
        let product_id = ProductId::from_ulid(Ulid::new());
        let color = Color::new("Gray").unwrap();
        let name = variant_logical_name(product_id, &color, "png");
        assert_eq!(name, format!("products/{product_id}/gray.png"));
        assert!(name.starts_with(&product_prefix(product_id)));
    }

    #[rstest]
    #[case("products/a/b.jpg", true)]
    #[case("", false)]
    #[case("/etc/passwd", false)]
    #[case("products/../secret", false)]
    #[case("products//b.jpg", false)]
    #[case("products\\b.jpg", false)]
    fn storage_name_validation(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(validate_storage_name(name).is_ok(), ok);
    }
}
