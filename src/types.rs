//! Core types for the mindcast pipeline
//!
//! This module defines the data structures that flow through each stage of a
//! session: EEG bands and signal kinds on the way in, throw records and metric
//! results in the middle, and the persisted game record and report on the way out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// EEG frequency band reported by the headset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Band {
    Delta,
    Theta,
    LowAlpha,
    HighAlpha,
    LowBeta,
    HighBeta,
    LowGamma,
    MidGamma,
}

impl Band {
    /// All bands, in the order coordination reads them
    pub const ALL: [Band; 8] = [
        Band::Theta,
        Band::Delta,
        Band::LowAlpha,
        Band::HighAlpha,
        Band::LowBeta,
        Band::HighBeta,
        Band::LowGamma,
        Band::MidGamma,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Delta => "delta",
            Band::Theta => "theta",
            Band::LowAlpha => "lowAlpha",
            Band::HighAlpha => "highAlpha",
            Band::LowBeta => "lowBeta",
            Band::HighBeta => "highBeta",
            Band::LowGamma => "lowGamma",
            Band::MidGamma => "midGamma",
        }
    }
}

/// Proprietary headset signal carried by a signal event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    /// eSense attention, 0-100
    Attention,
    /// eSense meditation, 0-100
    Meditation,
    /// Contact quality, 0 (good) to 200 (no contact)
    PoorSignal,
    /// Any signal name this crate does not consume
    #[serde(other)]
    Unknown,
}

/// One successful throw detected by the accessory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowRecord {
    pub success: bool,
    /// Latest attention sample when the throw landed
    pub attention: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub is_big_throw: bool,
}

/// The four band-derived brain metrics, each in 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricScores {
    pub coordination: u8,
    pub brain_activity: u8,
    pub focus: u8,
    pub perception: u8,
}

/// Four-step grading used by the report screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Level {
    Weak = 1,
    Basic = 2,
    Good = 3,
    Excellent = 4,
}

impl Level {
    /// Grade a 0-100 score; out-of-range scores fall back to `Weak`
    pub fn from_score(score: i64) -> Self {
        match score {
            0..=30 => Level::Weak,
            31..=45 => Level::Basic,
            46..=60 => Level::Good,
            61..=100 => Level::Excellent,
            _ => Level::Weak,
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level as u8
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::Weak),
            2 => Ok(Level::Basic),
            3 => Ok(Level::Good),
            4 => Ok(Level::Excellent),
            other => Err(format!("level must be 1-4, got {other}")),
        }
    }
}

/// Levels for each capped metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricLevels {
    pub coordination: Level,
    pub brain_activity: Level,
    pub focus: Level,
    pub perception: Level,
}

impl From<&MetricScores> for MetricLevels {
    fn from(scores: &MetricScores) -> Self {
        Self {
            coordination: Level::from_score(scores.coordination as i64),
            brain_activity: Level::from_score(scores.brain_activity as i64),
            focus: Level::from_score(scores.focus as i64),
            perception: Level::from_score(scores.perception as i64),
        }
    }
}

/// Flat record handed to the storage collaborator at the end of a session.
///
/// Field names follow the host's storage columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub accuracy: u32,
    pub brain_power: u32,
    pub super_power: u32,
    pub endurance: u32,
    pub stability: u32,
    pub score: u32,
    pub success_count: u32,
    pub throw_count: u32,
    pub attention_avg: u32,
    pub meditation_avg: u32,
    pub coordination: u8,
    pub brain_activity: u8,
    pub focus: u8,
    pub perception: u8,
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
    /// Session length in seconds
    pub completion_time: u64,
}

/// Data quality flags raised while scoring a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    MissingAttention,
    MissingMeditation,
    MissingBandPower,
    PoorSignal,
    NoThrows,
}

/// Report producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Sample counts and flags describing how much data backed the scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportQuality {
    pub attention_samples: usize,
    pub meditation_samples: usize,
    pub band_samples: usize,
    /// Mean poor-signal value over the retained window
    pub mean_poor_signal: Option<f64>,
    pub flags: Vec<QualityFlag>,
}

/// End-of-session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub record: GameRecord,
    pub metrics: MetricScores,
    pub levels: MetricLevels,
    /// Share of the population with fewer hits than this session
    pub percentile_position: u32,
    pub quality: ReportQuality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(Level::from_score(0), Level::Weak);
        assert_eq!(Level::from_score(30), Level::Weak);
        assert_eq!(Level::from_score(31), Level::Basic);
        assert_eq!(Level::from_score(45), Level::Basic);
        assert_eq!(Level::from_score(46), Level::Good);
        assert_eq!(Level::from_score(60), Level::Good);
        assert_eq!(Level::from_score(61), Level::Excellent);
        assert_eq!(Level::from_score(100), Level::Excellent);
        assert_eq!(Level::from_score(-3), Level::Weak);
        assert_eq!(Level::from_score(150), Level::Weak);
    }

    #[test]
    fn test_level_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Level::Good).unwrap(), "3");
        let level: Level = serde_json::from_str("4").unwrap();
        assert_eq!(level, Level::Excellent);
        assert!(serde_json::from_str::<Level>("7").is_err());
    }

    #[test]
    fn test_signal_kind_wire_names() {
        let kind: SignalKind = serde_json::from_str("\"POOR_SIGNAL\"").unwrap();
        assert_eq!(kind, SignalKind::PoorSignal);
        let kind: SignalKind = serde_json::from_str("\"BLINK\"").unwrap();
        assert_eq!(kind, SignalKind::Unknown);
    }

    #[test]
    fn test_game_record_uses_camel_case() {
        let record = GameRecord {
            accuracy: 60,
            brain_power: 70,
            super_power: 50,
            endurance: 90,
            stability: 80,
            score: 300,
            success_count: 3,
            throw_count: 4,
            attention_avg: 80,
            meditation_avg: 60,
            coordination: 97,
            brain_activity: 50,
            focus: 85,
            perception: 40,
            user_name: "player".to_string(),
            timestamp: "2024-05-01T10:00:00Z".parse().unwrap(),
            completion_time: 90,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["brainPower"], 70);
        assert_eq!(json["successCount"], 3);
        assert_eq!(json["completionTime"], 90);
    }
}
