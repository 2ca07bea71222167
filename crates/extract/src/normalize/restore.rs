use tracing::instrument;

use super::{Normalizer, plist::{self, PlistValue}};
use crate::consts::APPLE_SLUG_REGEX;
use crate::error::Result;
use crate::models::RestoreImage;

/// Picks the restore image offered for the most devices in the restore
/// images property list. Ties go to whichever appears first.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreImageNormalizer;

impl Normalizer for RestoreImageNormalizer {
    type Output = Option<RestoreImage>;

    fn format(&self) -> &'static str {
        "restore-images"
    }

    #[instrument(skip_all, fields(bytes = raw.len()))]
    fn normalize(&self, raw: &str) -> Result<Option<RestoreImage>> {
        let root = plist::parse(raw)?;
        // (image, number of devices offering it), in first-seen order.
        let mut tally: Vec<(RestoreImage, usize)> = Vec::new();
        root.walk(&mut |value| {
            let Some(image) = restore_image(value) else {
                return;
            };
            match tally.iter_mut().find(|(seen, _)| seen.url == image.url) {
                Some((_, count)) => *count += 1,
                None => tally.push((image, 1)),
            }
        });
        let mut best: Option<(RestoreImage, usize)> = None;
        for (image, count) in tally {
            if best.as_ref().is_none_or(|(_, top)| count > *top) {
                best = Some((image, count));
            }
        }
        Ok(best.map(|(image, _)| image))
    }
}

fn restore_image(value: &PlistValue) -> Option<RestoreImage> {
    let url = value.get("FirmwareURL")?.as_str()?;
    let build = value.get("BuildVersion")?.as_str()?;
    let version = value.get("ProductVersion")?.as_str()?;
    Some(RestoreImage {
        url: url.to_string(),
        build: build.to_string(),
        version: version.to_string(),
        apple_slug: APPLE_SLUG_REGEX.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str().to_string()),
    })
}
