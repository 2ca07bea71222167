use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use crate::error::{Error, ErrorKind};

/// What sort of release an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReleaseKind {
    /// A regular OS update.
    Os,
    /// A Rapid Security Response, with its letter suffix (the `c` in
    /// "iOS 16.5.1 (c)").
    RapidResponse(char),
    /// XProtect plist configuration data.
    Config,
    /// XProtect remediator payloads.
    Remediator,
    /// XProtect plug-in service.
    PluginService,
}
impl FromStr for ReleaseKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "OS" => Self::Os,
            "Config" => Self::Config,
            "Remediator" => Self::Remediator,
            "Plug-in" => Self::PluginService,
            other => {
                let mut letter = other.strip_prefix("RSR_").unwrap_or_default().chars();
                match (letter.next(), letter.next()) {
                    (Some(c), None) => Self::RapidResponse(c),
                    _ => exn::bail!(ErrorKind::ParseError {
                        field: "release_type",
                        value: other.to_string(),
                    }),
                }
            },
        })
    }
}
impl Display for ReleaseKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReleaseKind::Os => f.write_str("OS"),
            ReleaseKind::RapidResponse(letter) => write!(f, "RSR_{letter}"),
            ReleaseKind::Config => f.write_str("Config"),
            ReleaseKind::Remediator => f.write_str("Remediator"),
            ReleaseKind::PluginService => f.write_str("Plug-in"),
        }
    }
}

impl Serialize for ReleaseKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
impl<'de> Deserialize<'de> for ReleaseKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|err: Error| D::Error::custom(&*err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("OS", ReleaseKind::Os)]
    #[case("RSR_c", ReleaseKind::RapidResponse('c'))]
    #[case("Config", ReleaseKind::Config)]
    #[case("Remediator", ReleaseKind::Remediator)]
    #[case("Plug-in", ReleaseKind::PluginService)]
    fn kind_display_matches_parse(#[case] raw: &str, #[case] kind: ReleaseKind) {
        assert_eq!(raw.parse::<ReleaseKind>().unwrap(), kind);
        assert_eq!(kind.to_string(), raw);
    }

    #[rstest]
    #[case("RSR_")]
    #[case("RSR_ab")]
    #[case("Firmware")]
    fn unknown_kinds_are_rejected(#[case] raw: &str) {
        assert!(raw.parse::<ReleaseKind>().is_err());
    }
}
