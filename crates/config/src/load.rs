use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use sofa_extract::models::Family;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::model::{Config, SoftwareRelease};

const LOCAL_CONFIG: &str = "config.json";
const ENV_PREFIX: &str = "SOFA_";
const TIMESTAMP_ENV: &str = "TIMESTAMP_FILE_PATH";

impl Config {
    /// Loads the layered configuration.
    ///
    /// An explicit `path` must exist; the implicit locations are skipped when
    /// absent. Relative certificate paths end up anchored at the directory of
    /// the file that was read.
    #[instrument(skip_all, fields(path = ?path))]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = config_file(path)?;
        let mut config: Config = layers(file.as_deref())?.extract().or_raise(|| ErrorKind::Invalid)?;
        if let Some(dir) = file.as_deref().and_then(Path::parent).filter(|dir| !dir.as_os_str().is_empty()) {
            config.sources.resolve_relative_to(dir);
        }
        tracing::debug!(releases = config.software_releases.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        layers(config_file(path)?.as_deref())
    }

    /// Checks the configuration can drive a run of `families`.
    pub fn validate_for(&self, families: &[Family]) -> Result<()> {
        if self.provenance_capacity == 0 {
            exn::bail!(ErrorKind::Validation("provenance_capacity must be at least 1".to_string()));
        }
        for family in families {
            if self.releases(*family).next().is_none() {
                exn::bail!(ErrorKind::Validation(format!("no software releases configured for {family}")));
            }
        }
        Ok(())
    }

    /// Tracked releases of a family, in configured order.
    pub fn releases(&self, family: Family) -> impl Iterator<Item = &SoftwareRelease> {
        self.software_releases.iter().filter(move |release| release.os_type == family)
    }

    pub fn timestamp_path(&self) -> PathBuf {
        self.timestamp_file.clone().unwrap_or_else(|| self.output_dir.join("timestamp.json"))
    }
}

/// The file to read: the explicit `path`, which must exist, or the first
/// implicit location that does.
fn config_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    match path {
        Some(path) if !path.exists() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
        Some(path) => Ok(Some(path.to_path_buf())),
        None => Ok(default_file()),
    }
}

fn layers(file: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(file) = file {
        tracing::info!(path = %file.display(), "Reading configuration file");
        figment = match file.extension().and_then(|ext| ext.to_str()) {
            Some("json") => figment.merge(Json::file(file)),
            Some("toml") => figment.merge(Toml::file(file)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
        };
    }
    Ok(figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .merge(Env::raw().only(&[TIMESTAMP_ENV]).map(|_| "timestamp_file".into())))
}

fn default_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }
    ProjectDirs::from("io", "macadmins", "sofa")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_ROOT_CERTIFICATE;
    use figment::Jail;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        config.validate_for(&Family::ALL).unwrap();
        assert_eq!(config.timestamp_path(), PathBuf::from("./timestamp.json"));
        assert_eq!(config.releases(Family::Ios).count(), 2);
    }

    #[test]
    fn legacy_json_shape_is_accepted() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.json",
                r#"{
                    "softwareReleases": [
                        {"osType": "macOS", "name": "Sonoma 14", "releaseDate": "2023-09-26"},
                        {"osType": "iOS", "name": "17"}
                    ]
                }"#,
            )?;
            let config = Config::load(None).map_err(|err| err.to_string())?;
            assert_eq!(config.software_releases, [
                SoftwareRelease::new(Family::MacOs, "Sonoma 14"),
                SoftwareRelease::new(Family::Ios, "17"),
            ]);
            assert_eq!(config.provenance_capacity, 10);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("sofa.toml", "output_dir = \"public\"\nprovenance_capacity = 5\n")?;
            jail.set_env("SOFA_PROVENANCE_CAPACITY", "3");
            jail.set_env("SOFA_SOURCES__SECURITY_INDEX__URL", "https://example.com/index.html");
            jail.set_env("TIMESTAMP_FILE_PATH", "/var/lib/sofa/timestamp.json");
            let config = Config::load(Some(Path::new("sofa.toml"))).map_err(|err| err.to_string())?;
            assert_eq!(config.output_dir, PathBuf::from("public"));
            assert_eq!(config.provenance_capacity, 3);
            assert_eq!(config.sources.security_index.url, "https://example.com/index.html");
            assert!(config.sources.security_index.required);
            assert_eq!(config.timestamp_path(), PathBuf::from("/var/lib/sofa/timestamp.json"));
            Ok(())
        });
    }

    #[test]
    fn release_metadata_trusts_apple_root_by_default() {
        let config = Config::default();
        let release_metadata = &config.sources.release_metadata;
        assert_eq!(release_metadata.root_certificate.as_deref(), Some(Path::new(DEFAULT_ROOT_CERTIFICATE)));
        assert!(config.sources.security_index.root_certificate.is_none());
    }

    #[test]
    fn certificate_paths_are_relative_to_the_config_file() {
        Jail::expect_with(|jail| {
            jail.create_dir("etc")?;
            jail.create_file(
                "etc/sofa.toml",
                "[sources.restore_images]\nurl = \"https://example.com/ipsw.xml\"\nroot_certificate = \"/opt/ca.pem\"\n",
            )?;
            let config = Config::load(Some(Path::new("etc/sofa.toml"))).map_err(|err| err.to_string())?;
            assert_eq!(
                config.sources.release_metadata.root_certificate.as_deref(),
                Some(Path::new("etc/AppleRoot.pem"))
            );
            assert_eq!(config.sources.restore_images.root_certificate.as_deref(), Some(Path::new("/opt/ca.pem")));

            let config = Config::load(None).map_err(|err| err.to_string())?;
            assert_eq!(config.sources.release_metadata.root_certificate.as_deref(), Some(Path::new("AppleRoot.pem")));
            Ok(())
        });
    }

    #[test]
    fn explicit_path_must_exist() {
        Jail::expect_with(|_| {
            let err = Config::load(Some(Path::new("missing.yaml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::NotFound(_)));
            Ok(())
        });
    }

    #[test]
    fn validation_rejects_unusable_configs() {
        let mut config = Config::default();
        config.software_releases.retain(|release| release.os_type == Family::MacOs);
        assert!(config.validate_for(&[Family::MacOs]).is_ok());
        assert!(config.validate_for(&[Family::Ios]).is_err());
        config.provenance_capacity = 0;
        assert!(config.validate_for(&[Family::MacOs]).is_err());
    }
}
