use std::{
    borrow::Cow,
    cmp::Ordering,
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{
    Date, OffsetDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc2822, well_known::Rfc3339},
    macros::{datetime, format_description},
};

use crate::error::Error;

/// Devices that never received a dated release report "Preinstalled"; they
/// are pinned to the date the first such build shipped.
const PREINSTALLED: &str = "Preinstalled";
const PREINSTALLED_DATE: OffsetDateTime = datetime!(2021-10-25 00:00:00 UTC);

const CANONICAL: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
const DATE_FORMATS: [&[BorrowedFormatItem<'static>]; 3] = [
    format_description!("[year]-[month]-[day]"),
    format_description!("[day padding:none] [month repr:short] [year]"),
    format_description!("[month repr:long] [day padding:none], [year]"),
];

/// A release date as published upstream.
///
/// Every source spells dates differently; anything recognizable is
/// normalized to midnight UTC (or the exact instant, for timestamps). What
/// can't be recognized is kept verbatim so it still shows up in the output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReleaseDate {
    Instant(OffsetDateTime),
    Unparsed(String),
}
impl ReleaseDate {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(PREINSTALLED) {
            return Self::Instant(PREINSTALLED_DATE);
        }
        if let Ok(instant) = OffsetDateTime::parse(trimmed, &Rfc3339) {
            return Self::Instant(instant.to_offset(UtcOffset::UTC));
        }
        DATE_FORMATS
            .iter()
            .find_map(|format| Date::parse(trimmed, format).ok())
            .map(|date| Self::Instant(date.midnight().assume_utc()))
            .unwrap_or_else(|| Self::Unparsed(raw.to_string()))
    }

    pub fn date(&self) -> Option<Date> {
        match self {
            ReleaseDate::Instant(instant) => Some(instant.date()),
            ReleaseDate::Unparsed(_) => None,
        }
    }

    /// Whole days between two dates, regardless of which is earlier.
    pub fn days_between(&self, other: &ReleaseDate) -> Option<i64> {
        Some((self.date()? - other.date()?).whole_days().abs())
    }

    /// RFC 2822 rendering for syndication feeds.
    pub fn to_rfc2822(&self) -> Option<String> {
        match self {
            ReleaseDate::Instant(instant) => instant.format(&Rfc2822).ok(),
            ReleaseDate::Unparsed(_) => None,
        }
    }

    /// The canonical text form, which is also the ordering key.
    fn sort_key(&self) -> Cow<'_, str> {
        match self {
            ReleaseDate::Instant(_) => Cow::Owned(self.to_string()),
            ReleaseDate::Unparsed(raw) => Cow::Borrowed(raw),
        }
    }
}
impl From<OffsetDateTime> for ReleaseDate {
    fn from(instant: OffsetDateTime) -> Self {
        Self::Instant(instant.to_offset(UtcOffset::UTC))
    }
}
impl FromStr for ReleaseDate {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
impl Display for ReleaseDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReleaseDate::Instant(instant) => {
                let rendered = instant.format(CANONICAL).map_err(|_| std::fmt::Error)?;
                f.write_str(&rendered)
            },
            ReleaseDate::Unparsed(raw) => f.write_str(raw),
        }
    }
}
impl Ord for ReleaseDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}
impl PartialOrd for ReleaseDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for ReleaseDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
impl<'de> Deserialize<'de> for ReleaseDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::parse(&String::deserialize(deserializer)?))
    }
}
