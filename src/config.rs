//! Game configuration
//!
//! Constants the scoring core reads but does not own: throw limits, per-hit
//! scores and the population hit distribution used for percentile placement.
//! Defaults mirror the shipped game configuration.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Samples kept for attention, meditation and poor-signal series
pub const DEFAULT_SIGNAL_WINDOW: usize = 30;

/// Game configuration supplied by the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Throws per session; the accuracy divisor
    pub max_throws: u32,
    /// Minimum spacing between two counted throws (milliseconds); 0 counts every throw
    pub min_throw_interval_ms: u64,
    /// Points for a regular hit
    pub score_per_hit: u32,
    /// Points for a big hit
    pub score_per_big_hit: u32,
    /// Hit count -> percentage of players achieving exactly that many hits
    pub hit_distribution: BTreeMap<u32, f64>,
    /// Bounded window for attention/meditation/poor-signal series
    pub signal_window: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        let hit_distribution = BTreeMap::from([
            (0, 15.0),
            (1, 55.0),
            (2, 25.0),
            (3, 4.0),
            (4, 0.8),
            (5, 0.2),
        ]);

        Self {
            max_throws: 5,
            min_throw_interval_ms: 0,
            score_per_hit: 100,
            score_per_big_hit: 500,
            hit_distribution,
            signal_window: DEFAULT_SIGNAL_WINDOW,
        }
    }
}

impl GameConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }

    /// Check values the scoring formulas depend on
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.max_throws == 0 {
            return Err(ComputeError::InvalidConfig(
                "max_throws must be greater than zero".to_string(),
            ));
        }

        if self.signal_window == 0 {
            return Err(ComputeError::InvalidConfig(
                "signal_window must be greater than zero".to_string(),
            ));
        }

        if let Some((hits, pct)) = self
            .hit_distribution
            .iter()
            .find(|(_, pct)| !pct.is_finite() || **pct < 0.0)
        {
            return Err(ComputeError::InvalidConfig(format!(
                "hit_distribution[{hits}] must be a non-negative percentage, got {pct}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_matches_game_constants() {
        let config = GameConfig::default();
        assert_eq!(config.max_throws, 5);
        assert_eq!(config.score_per_hit, 100);
        assert_eq!(config.score_per_big_hit, 500);
        assert_eq!(config.hit_distribution.get(&1), Some(&55.0));
        assert_eq!(config.min_throw_interval_ms, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GameConfig::from_json(r#"{ "max_throws": 10 }"#).unwrap();
        assert_eq!(config.max_throws, 10);
        assert_eq!(config.score_per_big_hit, 500);
        assert_eq!(config.signal_window, 30);
    }

    #[test]
    fn test_distribution_keys_parse_from_strings() {
        let config =
            GameConfig::from_json(r#"{ "hit_distribution": { "0": 40, "1": 60 } }"#).unwrap();
        assert_eq!(config.hit_distribution.len(), 2);
        assert_eq!(config.hit_distribution[&1], 60.0);
    }

    #[test]
    fn test_zero_max_throws_rejected() {
        let result = GameConfig::from_json(r#"{ "max_throws": 0 }"#);
        assert!(matches!(result, Err(ComputeError::InvalidConfig(_))));
    }

    #[test]
    fn test_negative_distribution_rejected() {
        let result = GameConfig::from_json(r#"{ "hit_distribution": { "0": -1 } }"#);
        assert!(matches!(result, Err(ComputeError::InvalidConfig(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = GameConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(GameConfig::from_json(&json).unwrap(), config);
    }
}
