use std::collections::VecDeque;

use memchr::memmem;
use scraper::Html;
use tracing::instrument;

use super::Normalizer;
use crate::consts::{CVE_REGEX, EXPLOITED_REGEX};
use crate::error::Result;
use crate::models::CveMap;

/// Fragments before the one containing a CVE that are searched, together
/// with that one, for an exploitation notice.
pub const CVE_WINDOW: usize = 5;
const NO_PUBLISHED_ENTRIES: &[u8] = b"no published CVE entries";

/// The security content of one advisory page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advisory {
    pub cves: CveMap,
    pub no_published_entries: bool,
}

/// Reads CVE identifiers, and whether each was actively exploited, out of an
/// advisory page.
///
/// Advisories list an "Impact:" paragraph before the CVE it belongs to, so a
/// CVE counts as exploited when the exploitation notice appears in the short
/// run of text leading up to (and including) its first mention.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvisoryNormalizer;

impl Normalizer for AdvisoryNormalizer {
    type Output = Advisory;

    fn format(&self) -> &'static str {
        "advisory"
    }

    #[instrument(skip_all, fields(bytes = raw.len()))]
    fn normalize(&self, raw: &str) -> Result<Advisory> {
        if memmem::find(raw.as_bytes(), NO_PUBLISHED_ENTRIES).is_some() {
            return Ok(Advisory { cves: CveMap::default(), no_published_entries: true });
        }
        let document = Html::parse_document(raw);
        let mut cves = CveMap::default();
        let mut window: VecDeque<&str> = VecDeque::with_capacity(CVE_WINDOW + 1);
        for fragment in document.root_element().text().map(str::trim).filter(|s| !s.is_empty()) {
            window.push_back(fragment);
            let mut found = CVE_REGEX.find_iter(fragment).map(|m| m.as_str()).filter(|cve| !cves.contains(cve)).peekable();
            if found.peek().is_some() {
                let context = window.iter().copied().collect::<Vec<_>>().join(" ");
                let exploited = EXPLOITED_REGEX.is_match(&context);
                for cve in found.collect::<Vec<_>>() {
                    cves.insert_first(cve, exploited);
                }
            }
            while window.len() > CVE_WINDOW {
                window.pop_front();
            }
        }
        tracing::debug!(cves = cves.len(), exploited = cves.exploited().len(), "Read advisory");
        Ok(Advisory { cves, no_published_entries: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn advisory(body: &str) -> Advisory {
        AdvisoryNormalizer.normalize(&format!("<html><body>{body}</body></html>")).unwrap()
    }

    #[test]
    fn exploitation_notice_before_cve_marks_it_exploited() {
        let result = advisory(
            "<p><strong>Kernel</strong></p>\
             <p>Impact: An attacker with arbitrary kernel read and write capability may be able to \
             bypass kernel memory protections. Apple is aware of a report that this issue may have \
             been exploited.</p>\
             <p>Description: A memory corruption issue was addressed with improved validation.</p>\
             <p>CVE-2024-23225</p>",
        );
        assert_eq!(result.cves.is_exploited("CVE-2024-23225"), Some(true));
        assert_eq!(result.cves.exploited(), ["CVE-2024-23225"]);
    }

    #[rstest]
    #[case::same_fragment(None, true)]
    #[case::adjacent(Some(0), true)]
    #[case::last_in_window(Some(CVE_WINDOW - 1), true)]
    #[case::just_outside(Some(CVE_WINDOW), false)]
    fn notice_counts_within_the_window(#[case] fillers: Option<usize>, #[case] exploited: bool) {
        let notice = "Impact: something. Apple is aware of a report that this issue may have been exploited.";
        let body = match fillers {
            None => format!("<p>{notice} CVE-2024-0001</p>"),
            Some(count) => {
                let fillers: String = (0..count).map(|i| format!("<p>filler {i}</p>")).collect();
                format!("<p>{notice}</p>{fillers}<p>CVE-2024-0001</p>")
            },
        };
        assert_eq!(advisory(&body).cves.is_exploited("CVE-2024-0001"), Some(exploited));
    }

    #[test]
    fn first_mention_decides_classification() {
        let result = advisory(
            "<p>CVE-2024-1111</p>\
             <p>Impact: x. Apple is aware of a report that this issue may have been actively exploited.</p>\
             <p>CVE-2024-1111 and CVE-2024-2222</p>",
        );
        assert_eq!(result.cves.is_exploited("CVE-2024-1111"), Some(false));
        assert_eq!(result.cves.is_exploited("CVE-2024-2222"), Some(true));
        assert_eq!(result.cves.len(), 2);
    }

    #[test]
    fn marker_short_circuits_to_empty() {
        let result = advisory("<p>This update has no published CVE entries.</p><p>CVE-2024-9999</p>");
        assert!(result.no_published_entries);
        assert!(result.cves.is_empty());
    }

    #[test]
    fn pages_without_cves_give_empty_map() {
        let result = advisory("<p>About the security content of Safari 17.4</p>");
        assert!(!result.no_published_entries);
        assert!(result.cves.is_empty());
    }
}
