//! Server configuration, parsed from a TOML file plus environment overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vaporkit_core::crypto::KdfParams;
use vaporkit_core::network::{Chain, Network, NetworkParams};

/// Top-level server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,

    /// Which chain and network addresses are encoded for
    #[serde(default)]
    pub network: NetworkSection,

    #[serde(default)]
    pub keystore: KeystoreSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Log filter in `RUST_LOG` form: a bare level such as `info`, or
    /// comma-separated directives such as `info,vaporkit_tx=debug`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSection {
    /// "sidechain" or "mainchain"
    #[serde(default = "default_chain")]
    pub chain: String,

    /// "main", "test" or "solo"
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            chain: default_chain(),
            network: default_network(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreSection {
    /// Directory of `*.json` keystore files, read once at start. Keys
    /// created or re-passworded while serving are kept in memory only.
    pub dir: Option<PathBuf>,

    /// Argon2 cost profile for new keystores: "standard" or "light"
    #[serde(default = "default_kdf")]
    pub kdf: String,
}

impl Default for KeystoreSection {
    fn default() -> Self {
        Self {
            dir: None,
            kdf: default_kdf(),
        }
    }
}

/// Check a `RUST_LOG` style filter. Each directive is `level`, `module` or
/// `module=level`, and every level must parse as a `log::LevelFilter`.
fn is_log_filter(filter: &str) -> bool {
    let directives = filter.split('/').next().unwrap_or_default();
    !directives.trim().is_empty()
        && directives
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .all(|d| match d.split_once('=') {
                Some((module, level)) => {
                    !module.trim().is_empty() && level.trim().parse::<log::LevelFilter>().is_ok()
                }
                None => {
                    d.parse::<log::LevelFilter>().is_ok()
                        || d.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ':')
                }
            })
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_chain() -> String {
    "sidechain".to_string()
}

fn default_network() -> String {
    "main".to_string()
}

fn default_kdf() -> String {
    "standard".to_string()
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ServerConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `VAPORKIT_LOG_LEVEL`
    /// - `VAPORKIT_CHAIN`
    /// - `VAPORKIT_NETWORK`
    /// - `VAPORKIT_KEYSTORE_DIR`
    /// - `VAPORKIT_KDF`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VAPORKIT_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Ok(v) = std::env::var("VAPORKIT_CHAIN") {
            self.network.chain = v;
        }
        if let Ok(v) = std::env::var("VAPORKIT_NETWORK") {
            self.network.network = v;
        }
        if let Ok(v) = std::env::var("VAPORKIT_KEYSTORE_DIR") {
            self.keystore.dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("VAPORKIT_KDF") {
            self.keystore.kdf = v;
        }
    }

    /// The parameter set every request is served with
    pub fn network_params(&self) -> Result<NetworkParams> {
        let chain: Chain = self.network.chain.parse()?;
        let network: Network = self.network.network.parse()?;
        Ok(NetworkParams::new(chain, network))
    }

    pub fn kdf_params(&self) -> Result<KdfParams> {
        match self.keystore.kdf.as_str() {
            "standard" => Ok(KdfParams::standard()),
            "light" => Ok(KdfParams::light()),
            other => anyhow::bail!("keystore.kdf must be \"standard\" or \"light\", got {:?}", other),
        }
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        self.network_params().context("invalid [network] section")?;
        self.kdf_params()?;

        if let Some(ref dir) = self.keystore.dir {
            anyhow::ensure!(
                dir.is_dir(),
                "keystore.dir {} is not a directory",
                dir.display()
            );
        }

        anyhow::ensure!(
            is_log_filter(&self.server.log_level),
            "server.log_level {:?} is not a log filter",
            self.server.log_level
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use vaporkit_core::network::{MAINCHAIN_TEST, SIDECHAIN_MAIN};

    fn full_toml() -> &'static str {
        r#"
[server]
log_level = "debug"

[network]
chain = "mainchain"
network = "test"

[keystore]
kdf = "light"
"#
    }

    fn load(toml: &str) -> ServerConfig {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", toml).unwrap();
        ServerConfig::from_file(file.path()).unwrap()
    }

    #[test]
    fn test_parse_empty_config() {
        let config = load("");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.network_params().unwrap(), SIDECHAIN_MAIN);
        assert_eq!(config.kdf_params().unwrap(), KdfParams::standard());
        assert!(config.keystore.dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = load(full_toml());
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.network_params().unwrap(), MAINCHAIN_TEST);
        assert_eq!(config.kdf_params().unwrap(), KdfParams::light());
    }

    #[test]
    fn test_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = load(full_toml());

        std::env::set_var("VAPORKIT_CHAIN", "sidechain");
        std::env::set_var("VAPORKIT_KEYSTORE_DIR", dir.path());
        std::env::set_var("VAPORKIT_KDF", "standard");

        config.apply_env_overrides();

        assert_eq!(config.network.chain, "sidechain");
        assert_eq!(config.network.network, "test");
        assert_eq!(config.keystore.dir.as_deref(), Some(dir.path()));
        assert_eq!(config.keystore.kdf, "standard");
        assert!(config.validate().is_ok());

        std::env::remove_var("VAPORKIT_CHAIN");
        std::env::remove_var("VAPORKIT_KEYSTORE_DIR");
        std::env::remove_var("VAPORKIT_KDF");
    }

    #[test]
    fn test_validation_unknown_names() {
        let config = load("[network]\nchain = \"bitcoin\"\n");
        assert!(config.validate().is_err());

        let config = load("[network]\nnetwork = \"regtest\"\n");
        assert!(config.validate().is_err());

        let config = load("[keystore]\nkdf = \"scrypt\"\n");
        assert!(config.validate().is_err());

        let config = load("[server]\nlog_level = \"vaporkit=loud\"\n");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_filter_directives() {
        for ok in ["info", "WARN", "info,vaporkit_tx=debug", "vaporkit_server=trace", "vaporkit_core"] {
            assert!(is_log_filter(ok), "{} rejected", ok);
        }
        for bad in ["", "info,vaporkit_tx=loud", "=debug", "debug!"] {
            assert!(!is_log_filter(bad), "{} accepted", bad);
        }

        let config = load("[server]\nlog_level = \"warn,vaporkit_tx=debug\"\n");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_keystore_dir() {
        let config = load("[keystore]\ndir = \"/definitely/not/here\"\n");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = load(full_toml());
        let serialized = toml::to_string_pretty(&config).unwrap();
        let reparsed: ServerConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.network.chain, config.network.chain);
        assert_eq!(reparsed.keystore.kdf, config.keystore.kdf);
    }
}
