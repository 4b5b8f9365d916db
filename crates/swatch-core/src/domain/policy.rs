//! Main image policy: decides whether a freshly created variant becomes the
//! product's main image.
//!
//! Policies are pure functions: given the product as it is now, the new
//! variant and its position among the product's variants, they return what
//! to do. Applying the decision (the store write) is the upload pipeline's
//! job.

use super::catalog::Product;
use super::variant::ProductImage;

/// What to do with the product's main image after an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainImageDecision {
    /// Leave the pointer alone.
    Keep,

    /// Point it at the new variant, but only if it is still unset at write
    /// time (compare-and-set in the store).
    AssignIfUnset,

    /// Point it at the new variant unconditionally.
    Overwrite,
}

/// Everything a policy may look at.
#[derive(Debug, Clone, Copy)]
pub struct MainImageContext<'a> {
    /// The product as read after the variant was created.
    pub product: &'a Product,

    /// The variant just created.
    pub variant: &'a ProductImage,

    /// Position of `variant` among the product's variants, by creation order.
    pub ordinal: usize,

    /// Whether the caller asked for this upload to become the main image.
    pub requested: bool,
}

/// Trait for deciding the main image after an upload.
///
/// Implementations must not have side effects; they are swapped in through
/// `AppBuilder::with_main_image_policy`.
pub trait MainImagePolicy: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn decide(&self, ctx: &MainImageContext<'_>) -> MainImageDecision;
}

/// Default policy: the first variant ever uploaded for a product becomes its
/// main image, provided no main image is set.
///
/// This is order-dependent on purpose. Uploading Gray before Black makes
/// Gray the main image. Later uploads never move the pointer, and the
/// `requested` flag is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstVariantWins;

impl MainImagePolicy for FirstVariantWins {
    fn name(&self) -> &'static str {
        "first_variant_wins"
    }

    fn decide(&self, ctx: &MainImageContext<'_>) -> MainImageDecision {
        if ctx.ordinal == 0 && ctx.product.main_image.is_none() {
            MainImageDecision::AssignIfUnset
        } else {
            MainImageDecision::Keep
        }
    }
}

/// Explicit designation by the caller: an upload flagged `make_main`
/// replaces the main image. Unflagged uploads fall back to
/// [`FirstVariantWins`] so a product never ends up without a main image
/// just because nobody asked.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerDesignated;

impl MainImagePolicy for CallerDesignated {
    fn name(&self) -> &'static str {
        "caller_designated"
    }

    fn decide(&self, ctx: &MainImageContext<'_>) -> MainImageDecision {
        if ctx.requested {
            MainImageDecision::Overwrite
        } else {
            FirstVariantWins.decide(ctx)
        }
    }
}
