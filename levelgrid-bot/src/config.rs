//! Serializable bot configuration.
//!
//! A config is loaded from TOML:
//!
//! ```toml
//! symbol = "BTC/USDT"
//! direction = "Neutral"
//!
//! [price_range]          # omit both bounds to derive them from detected levels
//! lower = 58000.0
//! upper = 64000.0
//!
//! [grid]
//! number = 10
//! type = "Geometric"
//!
//! [investment]
//! currency = "USDT"
//! leverage = "3x"
//! amount_percent = 25.0
//!
//! [analysis]
//! timeframe = "15m"
//! limit = 288
//! ```

use std::path::{Path, PathBuf};

use levelgrid_core::analysis::AnalysisParams;
use levelgrid_core::domain::{Direction, GridConfig, GridError, SpacingType};
use levelgrid_core::exchange::Timeframe;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content-addressable identifier of a configuration.
pub type RunId = String;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("price_range needs both lower and upper, or neither")]
    PartialRange,

    #[error("invalid price range: lower={lower}, upper={upper}")]
    InvalidRange { lower: f64, upper: f64 },

    #[error("grid.number must be at least 1")]
    ZeroGrids,

    #[error("investment.amount_percent must be within [0, 100], got {0}")]
    InvalidPercent(f64),

    #[error("invalid leverage '{0}' (expected e.g. \"10x\")")]
    InvalidLeverage(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Explicit bounds. Both absent means "derive from analysis".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

impl PriceRange {
    pub fn explicit(&self) -> Option<(f64, f64)> {
        self.lower.zip(self.upper)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    /// Number of grid intervals (the grid has `number + 1` prices).
    #[serde(default = "default_grid_number")]
    pub number: usize,
    #[serde(rename = "type", default)]
    pub spacing: SpacingType,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            number: default_grid_number(),
            spacing: SpacingType::default(),
        }
    }
}

fn default_grid_number() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentConfig {
    /// Quote currency whose free balance funds the grid.
    pub currency: String,
    /// Informational only; sizing does not apply it.
    #[serde(default = "default_leverage")]
    pub leverage: String,
    /// Share of the free balance to commit, in percent.
    pub amount_percent: f64,
}

fn default_leverage() -> String {
    "1x".to_string()
}

impl InvestmentConfig {
    /// Parse `"10x"`, `"10X"` or `"10"` into `10.0`.
    pub fn leverage_factor(&self) -> Result<f64, ConfigError> {
        let raw = self.leverage.trim();
        let digits = raw.strip_suffix(&['x', 'X'][..]).unwrap_or(raw).trim();
        match digits.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
            _ => Err(ConfigError::InvalidLeverage(self.leverage.clone())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    #[serde(default)]
    pub timeframe: Timeframe,
    /// Candles requested per analysis.
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(flatten)]
    pub params: AnalysisParams,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::default(),
            limit: default_limit(),
            params: AnalysisParams::default(),
        }
    }
}

fn default_limit() -> usize {
    288
}

/// Complete configuration of one grid bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    pub symbol: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub price_range: PriceRange,
    #[serde(default)]
    pub grid: GridSettings,
    pub investment: InvestmentConfig,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

impl BotConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BotConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }

        match (self.price_range.lower, self.price_range.upper) {
            (Some(lower), Some(upper)) => {
                let ok = lower.is_finite() && upper.is_finite() && lower > 0.0 && lower < upper;
                if !ok {
                    return Err(ConfigError::InvalidRange { lower, upper });
                }
            }
            (None, None) => {}
            _ => return Err(ConfigError::PartialRange),
        }

        if self.grid.number == 0 {
            return Err(ConfigError::ZeroGrids);
        }

        let pct = self.investment.amount_percent;
        if !(0.0..=100.0).contains(&pct) {
            return Err(ConfigError::InvalidPercent(pct));
        }
        if self.investment.currency.trim().is_empty() {
            return Err(ConfigError::Invalid("investment.currency must not be empty".into()));
        }
        self.investment.leverage_factor()?;

        let a = &self.analysis;
        if a.limit == 0 {
            return Err(ConfigError::Invalid("analysis.limit must be positive".into()));
        }
        if !(a.params.dedup_tolerance >= 0.0) {
            return Err(ConfigError::Invalid("analysis.dedup_tolerance must be >= 0".into()));
        }
        if !(a.params.max_distance > 0.0) {
            return Err(ConfigError::Invalid("analysis.max_distance must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&a.params.validation_threshold) {
            return Err(ConfigError::Invalid(
                "analysis.validation_threshold must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Grid parameters for the given bounds.
    pub fn grid_config(&self, lower: f64, upper: f64) -> Result<GridConfig, GridError> {
        GridConfig::new(lower, upper, self.grid.number, self.grid.spacing, self.direction)
    }

    /// Deterministic BLAKE3 hash of the serialized configuration.
    ///
    /// Two identical configs share a RunId, so previews can be matched across runs.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
symbol = "BTC/USDT"
direction = "Long"

[price_range]
lower = 58000.0
upper = 64000.0

[grid]
number = 12
type = "Geometric"

[investment]
currency = "USDT"
leverage = "10x"
amount_percent = 25.0

[analysis]
timeframe = "15m"
limit = 500
min_touches = 3
max_distance = 0.1
"#;

    const MINIMAL: &str = r#"
symbol = "ETH/USDT"

[investment]
currency = "USDT"
amount_percent = 50
"#;

    #[test]
    fn parses_full_config() {
        let cfg = BotConfig::from_toml_str(FULL).unwrap();
        assert_eq!(cfg.direction, Direction::Long);
        assert_eq!(cfg.price_range.explicit(), Some((58_000.0, 64_000.0)));
        assert_eq!(cfg.grid.number, 12);
        assert_eq!(cfg.grid.spacing, SpacingType::Geometric);
        assert_eq!(cfg.investment.leverage_factor().unwrap(), 10.0);
        assert_eq!(cfg.analysis.timeframe, Timeframe::M15);
        assert_eq!(cfg.analysis.limit, 500);
        assert_eq!(cfg.analysis.params.min_touches, 3);
        assert_eq!(cfg.analysis.params.max_distance, 0.1);
        // Unset analysis knobs keep their defaults.
        assert_eq!(cfg.analysis.params.fractal_window, 2);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = BotConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(cfg.direction, Direction::Neutral);
        assert_eq!(cfg.price_range.explicit(), None);
        assert_eq!(cfg.grid.number, 10);
        assert_eq!(cfg.grid.spacing, SpacingType::Arithmetic);
        assert_eq!(cfg.investment.amount_percent, 50.0);
        assert_eq!(cfg.analysis, AnalysisSettings::default());
    }

    #[test]
    fn one_sided_range_is_rejected() {
        let toml = MINIMAL.replace("[investment]", "[price_range]\nlower = 10.0\n\n[investment]");
        assert!(matches!(
            BotConfig::from_toml_str(&toml),
            Err(ConfigError::PartialRange)
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let toml = FULL.replace("upper = 64000.0", "upper = 50000.0");
        assert!(matches!(
            BotConfig::from_toml_str(&toml),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn percent_out_of_bounds_is_rejected() {
        let toml = MINIMAL.replace("amount_percent = 50", "amount_percent = 150");
        assert!(matches!(
            BotConfig::from_toml_str(&toml),
            Err(ConfigError::InvalidPercent(_))
        ));
    }

    #[test]
    fn bad_leverage_is_rejected() {
        let toml = FULL.replace("\"10x\"", "\"lots\"");
        assert!(matches!(
            BotConfig::from_toml_str(&toml),
            Err(ConfigError::InvalidLeverage(_))
        ));
    }

    #[test]
    fn unknown_timeframe_is_a_parse_error() {
        let toml = FULL.replace("\"15m\"", "\"2h\"");
        assert!(matches!(
            BotConfig::from_toml_str(&toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_run_id_deterministic() {
        let cfg = BotConfig::from_toml_str(FULL).unwrap();
        assert_eq!(cfg.run_id(), cfg.clone().run_id());
        assert_eq!(cfg.run_id().len(), 64);
    }

    #[test]
    fn test_run_id_changes_with_params() {
        let a = BotConfig::from_toml_str(FULL).unwrap();
        let mut b = a.clone();
        b.grid.number = 13;
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn grid_config_carries_settings() {
        let cfg = BotConfig::from_toml_str(FULL).unwrap();
        let grid = cfg.grid_config(1.0, 2.0).unwrap();
        assert_eq!(grid.level_count, 12);
        assert_eq!(grid.spacing, SpacingType::Geometric);
        assert_eq!(grid.direction, Direction::Long);
    }
}
