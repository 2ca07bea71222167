//! Configuration for a feed run.
//!
//! Layers, lowest priority first:
//! 1. built-in defaults,
//! 2. a configuration file (`.json`, `.toml`, `.yaml`/`.yml`),
//! 3. `SOFA_`-prefixed environment variables, `__` separating nested keys
//!    (`SOFA_SOURCES__SECURITY_INDEX__URL`),
//! 4. `TIMESTAMP_FILE_PATH`, which overrides `timestamp_file`.
//!
//! Without an explicit path, `./config.json` is used when present, then
//! `config.toml` in the platform configuration directory.
//!
//! The release-metadata endpoint is served under Apple's own root. Its
//! certificate is read from `AppleRoot.pem` (the Apple Root CA from
//! <https://www.apple.com/certificateauthority/>), next to the configuration
//! file or in the working directory when no file is used.

pub mod error;
mod load;
mod model;

pub use crate::model::{Config, DEFAULT_ROOT_CERTIFICATE, Endpoint, FeedMetadata, ModelTable, SoftwareRelease, Sources};
