use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

const MOBILE_RELEASE: &str = r"((iOS|iPadOS)\s+(\d+(?:\.\d+)?(?:\.\d+)?)(?:\s*\([a-z]\))?)?";

// Matches the leading release name in a security index row, e.g.
// "Rapid Security Response iOS 16.5.1 (c)" or "iOS 17.4 and iPadOS 17.4".
regex!(
    UPDATE_NAME_REGEX,
    format!(
        r"(?i)(Rapid Security Response)?\s*(macOS\s+\w+\s*\d+(?:\.\d+)*(?:\.\d+)*(?:\s*\([a-z]\))?)?\s*{}(\s+and\s+)?{}",
        MOBILE_RELEASE, MOBILE_RELEASE
    )
    .as_str()
);
regex!(PRODUCT_VERSION_REGEX, r"\d+(\.\d+)*");
regex!(RAPID_RESPONSE_LETTER_REGEX, r"\((\w)\)");
regex!(CVE_REGEX, r"\bCVE-\d{4,}-\d{4,}\b");
regex!(EXPLOITED_REGEX, r"(?s)Impact:.*Apple is aware.*may have been .*exploited");
regex!(APPLE_SLUG_REGEX, r"/(\d{3}-\d{4,6})/");
selector!(ROW_SELECTOR, "tr");
selector!(CELL_SELECTOR, "td");
selector!(LINK_SELECTOR, "a[href]");
