//! Configuration loading for ozdash
//!
//! Resolution priority: explicit path → `OZDASH_CONFIG` environment
//! variable → platform config dir (`<config>/ozdash/ozdash.toml`) →
//! compiled defaults. Individual toggles can be overridden from the
//! environment on top of whichever file was loaded.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Port the HTTP API listens on
    pub listen_port: u16,
    /// World Bank API base URL
    pub world_bank_base: String,
    /// ISO country code queried for indicators
    pub country: String,
    /// Market data API base URL
    pub market_base: String,
    /// Market index symbol used as a business-activity proxy
    pub market_symbol: String,
    /// Indicator lookback window, `start:end` years
    pub lookback: String,
    /// Observations requested per indicator
    pub per_page: u32,
    /// Per-request timeout for upstream fetches, seconds
    pub request_timeout_secs: u64,
    /// Attempt the World Bank indicator adapter
    pub use_primary: bool,
    /// Attempt the market index adapter
    pub use_secondary: bool,
    /// Enable the simulated variation adapter
    pub simulate: bool,
    /// Fixed seed for the simulated adapter (reproducible runs)
    pub simulation_seed: Option<u64>,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            listen_port: 5810,
            world_bank_base: "https://api.worldbank.org/v2".to_string(),
            country: "AUS".to_string(),
            market_base: "https://query1.finance.yahoo.com".to_string(),
            market_symbol: "^AXJO".to_string(),
            lookback: "2015:2024".to_string(),
            per_page: 10,
            request_timeout_secs: 10,
            use_primary: true,
            use_secondary: true,
            simulate: false,
            simulation_seed: None,
        }
    }
}

impl DashConfig {
    /// Load configuration following the resolution priority order.
    ///
    /// A missing file at the default location is fine (defaults apply); an
    /// explicitly named file that cannot be read or parsed is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit {
            info!(path = %path.display(), "Loading config from explicit path");
            Self::from_file(path)?
        } else if let Ok(path) = std::env::var("OZDASH_CONFIG") {
            info!(path = %path, "Loading config from OZDASH_CONFIG");
            Self::from_file(Path::new(&path))?
        } else {
            let default_path = Self::default_path();
            match default_path {
                Some(ref path) if path.exists() => {
                    info!(path = %path.display(), "Loading config from default location");
                    Self::from_file(path)?
                }
                _ => Self::default(),
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {} failed: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("parse {} failed: {e}", path.display())))
    }

    /// Platform default config path: `<config dir>/ozdash/ozdash.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ozdash").join("ozdash.toml"))
    }

    /// Environment toggles layered over the loaded file
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_bool("OZDASH_USE_PRIMARY") {
            self.use_primary = v;
        }
        if let Some(v) = env_bool("OZDASH_USE_SECONDARY") {
            self.use_secondary = v;
        }
        if let Some(v) = env_bool("OZDASH_SIMULATE") {
            self.simulate = v;
        }
        if let Ok(seed) = std::env::var("OZDASH_SIMULATION_SEED") {
            if let Ok(seed) = seed.parse() {
                self.simulation_seed = Some(seed);
            }
        }
    }
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|v| parse_bool(&v))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_original_dashboard_policy() {
        let config = DashConfig::default();
        assert!(config.use_primary);
        assert!(config.use_secondary);
        assert!(!config.simulate);
        assert_eq!(config.country, "AUS");
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn parses_partial_toml_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "simulate = true\nsimulation_seed = 42\nlisten_port = 6000"
        )
        .unwrap();

        let config = DashConfig::from_file(file.path()).unwrap();
        assert!(config.simulate);
        assert_eq!(config.simulation_seed, Some(42));
        assert_eq!(config.listen_port, 6000);
        // untouched fields keep defaults
        assert_eq!(config.country, "AUS");
    }

    #[test]
    fn rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "simulate = maybe").unwrap();

        let err = DashConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
