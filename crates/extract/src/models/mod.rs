mod assets;
mod date;
mod device;
mod entry;
mod family;
mod kind;
mod record;
mod security;
mod xprotect;

pub use self::assets::{AssetCatalog, AssetRecord};
pub use self::date::ReleaseDate;
pub use self::device::{ModelEntry, ModelInfo, SupportedDevicesEntry};
pub use self::entry::{ChangeFeedEntry, typed_key};
pub use self::family::{Family, Product};
pub use self::kind::ReleaseKind;
pub use self::record::{ReleaseRecord, SecurityDetails, SecurityRelease};
pub use self::security::{CveMap, SecurityInfo};
pub use self::xprotect::{BundleVersions, RestoreImage};

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace(['-', '_', ' '], "")
}
