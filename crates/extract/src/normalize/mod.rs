//! Normalizers, one per upstream format.
//!
//! Each turns the raw text of one source into canonical records. Malformed
//! input is an error from [`Normalizer::normalize`]; callers that would rather
//! carry on with nothing use [`Normalizer::normalize_lenient`].

mod advisory;
mod catalog;
mod devices;
mod metadata;
pub mod plist;
mod restore;
mod security;

pub use self::advisory::{Advisory, AdvisoryNormalizer, CVE_WINDOW};
pub use self::catalog::{
    BundleManifestNormalizer, CatalogNormalizer, CatalogPackage, CatalogProduct, SoftwareCatalog,
};
pub use self::devices::{ModelTableNormalizer, SupportedDevicesNormalizer, merge_model_tables};
pub use self::metadata::ReleaseMetadataNormalizer;
pub use self::restore::RestoreImageNormalizer;
pub use self::security::{IndexRow, SecurityIndexNormalizer};

use crate::error::Result;

pub trait Normalizer {
    type Output: Default;

    /// Short label for the upstream format, used in log events.
    fn format(&self) -> &'static str;

    fn normalize(&self, raw: &str) -> Result<Self::Output>;

    /// Same as [`normalize`](Self::normalize), but malformed content gives
    /// an empty result (and a warning) instead of an error.
    fn normalize_lenient(&self, raw: &str) -> Self::Output {
        match self.normalize(raw) {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(format = self.format(), error = ?err, "Malformed upstream content, using empty result");
                Self::Output::default()
            },
        }
    }
}
