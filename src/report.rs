//! Session report encoding
//!
//! This module turns a finished session into the end-of-session report: capped
//! brain metrics with their levels, throw aggregates, data quality, and the flat
//! record handed to storage.

use crate::config::GameConfig;
use crate::error::ComputeError;
use crate::metrics::{
    average_rounded, endurance_score, stability_score, super_power_score, MetricScorer,
};
use crate::normalizer::mean;
use crate::scoring::{accuracy, brain_power, game_score, percentile_position};
use crate::session::Session;
use crate::types::{
    Band, GameRecord, MetricLevels, QualityFlag, ReportProducer, ReportQuality, SessionReport,
};
use crate::{MINDCAST_VERSION, PRODUCER_NAME};
use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Mean poor-signal above this marks the session as poorly connected
const POOR_SIGNAL_THRESHOLD: f64 = 50.0;

/// Encoder for end-of-session reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode a session into a report
    pub fn encode<R: Rng + ?Sized>(
        &self,
        session: &Session,
        config: &GameConfig,
        user_name: &str,
        completion_time: u64,
        rng: &mut R,
    ) -> SessionReport {
        let computed_at = Utc::now();
        let metrics = MetricScorer::score_capped(session.bands(), session.attention(), rng);

        let attention_avg = average_rounded(session.attention());
        let accuracy = accuracy(session.success_count(), session.throw_count(), config);

        let record = GameRecord {
            accuracy,
            brain_power: brain_power(attention_avg, accuracy),
            super_power: super_power_score(session.bands().values(Band::Theta)),
            endurance: endurance_score(session.attention(), session.meditation()),
            stability: stability_score(session.attention(), session.meditation()),
            score: game_score(session.throw_history(), config),
            success_count: session.success_count(),
            throw_count: session.throw_count(),
            attention_avg,
            meditation_avg: average_rounded(session.meditation()),
            coordination: metrics.coordination,
            brain_activity: metrics.brain_activity,
            focus: metrics.focus,
            perception: metrics.perception,
            user_name: user_name.to_string(),
            timestamp: computed_at,
            completion_time,
        };

        SessionReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: MINDCAST_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: computed_at.to_rfc3339(),
            levels: MetricLevels::from(&metrics),
            metrics,
            percentile_position: percentile_position(session.success_count(), config),
            quality: self.build_quality(session),
            record,
        }
    }

    /// Encode to pretty JSON
    pub fn encode_to_json<R: Rng + ?Sized>(
        &self,
        session: &Session,
        config: &GameConfig,
        user_name: &str,
        completion_time: u64,
        rng: &mut R,
    ) -> Result<String, ComputeError> {
        let report = self.encode(session, config, user_name, completion_time, rng);
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }

    fn build_quality(&self, session: &Session) -> ReportQuality {
        let mean_poor_signal = mean(session.poor_signal());
        let band_samples = session.bands().total_samples();

        let mut flags = Vec::new();
        if session.attention().is_empty() {
            flags.push(QualityFlag::MissingAttention);
        }
        if session.meditation().is_empty() {
            flags.push(QualityFlag::MissingMeditation);
        }
        if band_samples == 0 {
            flags.push(QualityFlag::MissingBandPower);
        }
        if mean_poor_signal.is_some_and(|p| p > POOR_SIGNAL_THRESHOLD) {
            flags.push(QualityFlag::PoorSignal);
        }
        if session.throw_count() == 0 {
            flags.push(QualityFlag::NoThrows);
        }

        ReportQuality {
            attention_samples: session.attention().len(),
            meditation_samples: session.meditation().len(),
            band_samples,
            mean_poor_signal,
            flags,
        }
    }
}
