//! Brain metric derivation
//!
//! This module reduces session sample buffers into 0-100 scores:
//! - Coordination, brain activity, focus and perception from band power
//! - Endurance, stability and averages from attention/meditation
//! - Super power from theta
//!
//! Each metric is an independent reduction with its own default when the
//! buffers it reads hold too little data.

use crate::normalizer::{mean, normalize, population_std_dev};
use crate::series::BandBuffers;
use crate::types::{Band, MetricScores};
use rand::Rng;

/// Score returned when a metric has nothing to work with
pub const DEFAULT_SCORE: u8 = 50;

/// Attention/meditation readings below this count as low
const LOW_SIGNAL_THRESHOLD: f64 = 40.0;

/// Valid theta power range for super power
const THETA_MIN: f64 = 4.3;
const THETA_MAX: f64 = 1_000_000.0;

/// Derives the four band-power metrics from session buffers
pub struct MetricScorer;

impl MetricScorer {
    /// Raw (uncapped) metrics
    pub fn score(bands: &BandBuffers, attention: &[f64]) -> MetricScores {
        let all_bands: Vec<&[f64]> = Band::ALL.iter().map(|b| bands.values(*b)).collect();
        let activity_bands = [
            bands.values(Band::LowBeta),
            bands.values(Band::HighBeta),
            bands.values(Band::LowGamma),
            bands.values(Band::MidGamma),
        ];
        let alpha = bands.concat(Band::LowAlpha, Band::HighAlpha);
        let beta = bands.concat(Band::LowBeta, Band::HighBeta);
        let gamma = bands.concat(Band::LowGamma, Band::MidGamma);

        MetricScores {
            coordination: coordination_score(&all_bands),
            brain_activity: brain_activity_score(&activity_bands),
            focus: focus_score(&alpha, &beta, attention),
            perception: perception_score(bands.values(Band::Theta), &gamma),
        }
    }

    /// Metrics with every perfect score replaced by [`cap_score`]
    pub fn score_capped<R: Rng + ?Sized>(
        bands: &BandBuffers,
        attention: &[f64],
        rng: &mut R,
    ) -> MetricScores {
        let raw = Self::score(bands, attention);
        MetricScores {
            coordination: cap_score(raw.coordination, rng),
            brain_activity: cap_score(raw.brain_activity, rng),
            focus: cap_score(raw.focus, rng),
            perception: cap_score(raw.perception, rng),
        }
    }
}

/// Round and clamp into [0, 100]
fn to_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Low spread between normalized band means reads as synchronized activity.
pub fn coordination_score(series: &[&[f64]]) -> u8 {
    let means: Vec<f64> = series.iter().filter_map(|s| mean(s)).collect();
    if means.len() < 2 {
        return DEFAULT_SCORE;
    }

    let normalized = normalize(&means);
    let std_dev = population_std_dev(&normalized).unwrap_or(0.0);
    to_score(100.0 - std_dev * 50.0)
}

/// Mean of the normalized beta/gamma band averages; zero-average bands are skipped.
pub fn brain_activity_score(series: &[&[f64]]) -> u8 {
    let means: Vec<f64> = series
        .iter()
        .filter_map(|s| mean(s))
        .filter(|m| *m != 0.0)
        .collect();
    if means.is_empty() {
        return DEFAULT_SCORE;
    }

    let normalized = normalize(&means);
    let avg = mean(&normalized).unwrap_or(0.5);
    to_score(avg * 100.0)
}

/// Beta share of normalized alpha/beta power. Falls back to average attention
/// when either band group is missing.
pub fn focus_score(alpha: &[f64], beta: &[f64], attention: &[f64]) -> u8 {
    let (Some(alpha_mean), Some(beta_mean)) = (mean(alpha), mean(beta)) else {
        return mean(attention).map(to_score).unwrap_or(DEFAULT_SCORE);
    };

    let normalized = normalize(&[alpha_mean, beta_mean]);
    let (norm_alpha, norm_beta) = (normalized[0], normalized[1]);
    let denominator = norm_alpha + norm_beta;
    if denominator == 0.0 {
        return DEFAULT_SCORE;
    }

    to_score(norm_beta / denominator * 100.0)
}

/// Weighted theta/gamma blend (40/60). A single available group is scaled
/// against a fixed 10000 reference instead.
pub fn perception_score(theta: &[f64], gamma: &[f64]) -> u8 {
    match (mean(theta), mean(gamma)) {
        (None, None) => DEFAULT_SCORE,
        (Some(only), None) | (None, Some(only)) => to_score(only / 10_000.0 * 100.0),
        (Some(theta_mean), Some(gamma_mean)) => {
            let normalized = normalize(&[theta_mean, gamma_mean]);
            to_score((normalized[0] * 0.4 + normalized[1] * 0.6) * 100.0)
        }
    }
}

/// Replace a perfect score with a random 97-99
pub fn cap_score<R: Rng + ?Sized>(score: u8, rng: &mut R) -> u8 {
    if score >= 100 {
        rng.gen_range(97..=99)
    } else {
        score
    }
}

/// Rounded mean, 0 when empty
pub fn average_rounded(values: &[f64]) -> u32 {
    mean(values).map(|m| m.round().max(0.0) as u32).unwrap_or(0)
}

/// Steadiness of attention and meditation: 100 minus their mean standard
/// deviation. Needs both series; 0 otherwise.
pub fn endurance_score(attention: &[f64], meditation: &[f64]) -> u32 {
    let (Some(att_sd), Some(med_sd)) = (
        population_std_dev(attention),
        population_std_dev(meditation),
    ) else {
        return 0;
    };

    let combined = (att_sd + med_sd) / 2.0;
    (100.0 - combined.min(100.0)).round() as u32
}

/// Share of time attention (60%) and meditation (40%) stayed at or above 40,
/// kept within 1-100. Needs both series; 50 otherwise.
pub fn stability_score(attention: &[f64], meditation: &[f64]) -> u32 {
    if attention.is_empty() || meditation.is_empty() {
        return DEFAULT_SCORE as u32;
    }

    let low_ratio = |values: &[f64]| {
        values.iter().filter(|v| **v < LOW_SIGNAL_THRESHOLD).count() as f64 / values.len() as f64
    };
    let weighted = low_ratio(attention) * 0.6 + low_ratio(meditation) * 0.4;

    ((1.0 - weighted) * 100.0).clamp(1.0, 100.0).round() as u32
}

/// Log-scaled average theta power. Readings outside 4.3..=1e6 are ignored;
/// 50 when none remain.
pub fn super_power_score(theta: &[f64]) -> u32 {
    let valid: Vec<f64> = theta
        .iter()
        .copied()
        .filter(|v| (THETA_MIN..=THETA_MAX).contains(v))
        .collect();

    let Some(avg) = mean(&valid) else {
        log::debug!(
            "no theta readings within range ({} total), using default super power",
            theta.len()
        );
        return DEFAULT_SCORE as u32;
    };

    if avg <= THETA_MIN {
        return 0;
    }

    let scaled = avg / 1000.0;
    let score = 50.0 + (scaled.ln() / 200f64.ln()) * 50.0;
    score.clamp(0.0, 100.0).round() as u32
}
