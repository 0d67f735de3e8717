//! Ledger configuration loading from config.toml
//!
//! The file is optional. It tunes boundary behavior (display offset, audit
//! page cap) and lists brands to seed on first run.

use crate::errors::{Error, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::Path;

const SECONDS_PER_HOUR: i32 = 3600;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Ledger tuning
    #[serde(default)]
    pub ledger: LedgerSettings,
    /// Brands to seed when missing
    #[serde(default)]
    pub brands: Vec<BrandConfig>,
}

/// Tunables for the ledger boundary
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Offset applied to timestamps shown to callers; storage stays UTC
    pub display_utc_offset_hours: i32,
    /// Upper bound on audit rows returned by one query
    pub max_audit_take: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            display_utc_offset_hours: 4,
            max_audit_take: 100,
        }
    }
}

impl LedgerSettings {
    /// The display offset as a chrono offset.
    pub fn display_offset(&self) -> Result<FixedOffset> {
        self.display_utc_offset_hours
            .checked_mul(SECONDS_PER_HOUR)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| Error::Config {
                message: format!(
                    "display_utc_offset_hours out of range: {}",
                    self.display_utc_offset_hours
                ),
            })
    }

    /// Caps a caller's audit page size at `max_audit_take`; no request means the cap.
    #[must_use]
    pub fn audit_take(&self, requested: Option<u64>) -> u64 {
        requested.map_or(self.max_audit_take, |take| take.min(self.max_audit_take))
    }
}

/// A brand to seed
#[derive(Debug, Deserialize, Clone)]
pub struct BrandConfig {
    /// Name of the brand
    pub name: String,
}

/// Loads ledger configuration from a TOML file
///
/// # Errors
/// Returns `Error::Io` if the file cannot be read and `Error::Config` if the
/// TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads ./config.toml, or the defaults if the file does not exist.
pub fn load_default_config() -> Result<Config> {
    let path = Path::new("config.toml");
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_ledger_config() {
        let toml_str = r#"
            [ledger]
            display_utc_offset_hours = 2
            max_audit_take = 25

            [[brands]]
            name = "Acme"

            [[brands]]
            name = "Globex"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ledger.display_utc_offset_hours, 2);
        assert_eq!(config.ledger.max_audit_take, 25);
        assert_eq!(config.brands.len(), 2);
        assert_eq!(config.brands[1].name, "Globex");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.ledger.display_utc_offset_hours, 4);
        assert_eq!(config.ledger.max_audit_take, 100);
        assert!(config.brands.is_empty());
    }

    #[test]
    fn test_display_offset_out_of_range() {
        let settings = LedgerSettings {
            display_utc_offset_hours: 30,
            ..LedgerSettings::default()
        };
        assert!(matches!(
            settings.display_offset(),
            Err(Error::Config { .. })
        ));
        assert_eq!(
            LedgerSettings::default().display_offset().unwrap(),
            FixedOffset::east_opt(4 * 3600).unwrap()
        );
    }

    #[test]
    fn test_audit_take_is_capped() {
        let settings = LedgerSettings {
            max_audit_take: 50,
            ..LedgerSettings::default()
        };
        assert_eq!(settings.audit_take(None), 50);
        assert_eq!(settings.audit_take(Some(10)), 10);
        assert_eq!(settings.audit_take(Some(500)), 50);
    }

    #[test]
    fn test_load_config_read_and_parse_failures() {
        let missing = std::env::temp_dir().join("voucher-ledger-missing-config.toml");
        assert!(matches!(load_config(&missing), Err(Error::Io(_))));

        let broken = std::env::temp_dir().join(format!(
            "voucher-ledger-broken-{}.toml",
            std::process::id()
        ));
        std::fs::write(&broken, "[ledger\nmax_audit_take = 1").unwrap();
        let result = load_config(&broken);
        std::fs::remove_file(&broken).unwrap();
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
