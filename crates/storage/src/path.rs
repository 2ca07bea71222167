//! Storage path validation.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalizes a storage path, rejecting anything that would resolve outside
/// the storage root.
///
/// `.` and repeated separators are dropped and `..` is resolved against the
/// components before it. Null bytes, platform prefixes and paths that end up
/// empty are rejected with [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sofa_storage::validate_path;
///
/// assert!(validate_path("macOS_rss_data.json").is_ok());
/// assert!(validate_path("advisories/3f2a9c.json").is_ok());
/// assert!(validate_path("../timestamp.json").is_err());
/// assert_eq!(
///     validate_path("./advisories//../iOS_cached.json").unwrap(),
///     Path::new("iOS_cached.json")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            // Unix paths may carry null bytes through `components()`, but
            // every syscall would truncate at them.
            Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(segment) => components.push(segment),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(invalid());
    }
    Ok(components.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("macOS_rss_data.json", "macOS_rss_data.json")]
    #[case("advisories/abc.json", "advisories/abc.json")]
    #[case("a//b/./c", "a/b/c")]
    #[case("a/b/..", "a")]
    #[case("/timestamp.json", "timestamp.json")]
    #[case("cache/", "cache")]
    fn valid_paths_are_normalized(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("a/../../b")]
    #[case("..")]
    #[case("a\0b")]
    #[case("")]
    #[case("./.")]
    #[case("//")]
    fn invalid_paths_are_rejected(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
