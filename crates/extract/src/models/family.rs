use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use super::sanitize;
use crate::error::{Error, ErrorKind};

/// An OS family tracked by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    #[serde(rename = "macOS")]
    MacOs,
    #[serde(rename = "iOS")]
    Ios,
}
impl Family {
    pub const ALL: [Family; 2] = [Family::MacOs, Family::Ios];

    /// Display name, also the key of this family's list in the release
    /// metadata asset sets.
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::MacOs => "macOS",
            Family::Ios => "iOS",
        }
    }

    /// File stem used for per-family outputs.
    pub fn slug(&self) -> &'static str {
        match self {
            Family::MacOs => "macos",
            Family::Ios => "ios",
        }
    }
}
impl FromStr for Family {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "macos" | "mac" | "osx" => Self::MacOs,
            "ios" | "ipados" => Self::Ios,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "family",
                value: format!("unknown OS family: {s}"),
            }),
        })
    }
}
impl Display for Family {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Product line a change-feed entry belongs to.
///
/// Everything an OS family publishes is filed under that family, plus the
/// standalone XProtect components shipped through the software catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Product {
    #[serde(rename = "macOS")]
    MacOs,
    #[serde(rename = "iOS")]
    Ios,
    XProtect,
}
impl Product {
    pub const ALL: [Product; 3] = [Product::MacOs, Product::Ios, Product::XProtect];

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::MacOs => "macOS",
            Product::Ios => "iOS",
            Product::XProtect => "XProtect",
        }
    }
}
impl From<Family> for Product {
    fn from(family: Family) -> Self {
        match family {
            Family::MacOs => Product::MacOs,
            Family::Ios => Product::Ios,
        }
    }
}
impl FromStr for Product {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match sanitize(s).as_str() {
            "xprotect" => Ok(Self::XProtect),
            _ => s.parse::<Family>().map(Self::from),
        }
    }
}
impl Display for Product {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
