//! Synthetic device event generator
//!
//! Produces a plausible headset + accessory stream for demos and tests without
//! hardware: attention and meditation follow slow sine/cosine waves, contact
//! quality is mostly good, band powers are drawn uniformly within typical
//! ranges, and throws land at a fixed cadence with a configurable hit rate.

use crate::schema::DeviceEvent;
use crate::types::{Band, SignalKind};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Upper bound of simulated power per band
const BAND_RANGES: [(Band, f64); 8] = [
    (Band::Delta, 1_000_000.0),
    (Band::Theta, 800_000.0),
    (Band::LowAlpha, 600_000.0),
    (Band::HighAlpha, 500_000.0),
    (Band::LowBeta, 400_000.0),
    (Band::HighBeta, 300_000.0),
    (Band::LowGamma, 200_000.0),
    (Band::MidGamma, 100_000.0),
];

/// Simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Session length in seconds
    pub duration_secs: u64,
    /// Interval between eSense signal events (milliseconds)
    pub signal_interval_ms: u64,
    /// Interval between band power snapshots (milliseconds)
    pub eeg_interval_ms: u64,
    /// Interval between throws (milliseconds); 0 disables throws
    pub throw_interval_ms: u64,
    /// Probability that a throw hits
    pub hit_rate: f64,
    /// Probability that a hit is a big throw
    pub big_hit_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_secs: 90,
            signal_interval_ms: 1000,
            eeg_interval_ms: 1000,
            throw_interval_ms: 15_000,
            hit_rate: 0.5,
            big_hit_rate: 0.2,
        }
    }
}

/// Deterministic (seeded) event generator
pub struct Simulator {
    config: SimulationConfig,
    rng: StdRng,
    start: DateTime<Utc>,
}

impl Simulator {
    pub fn new(config: SimulationConfig, seed: u64, start: DateTime<Utc>) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            start,
        }
    }

    /// Generate the full event stream in timestamp order
    pub fn generate(&mut self) -> Vec<DeviceEvent> {
        let end_ms = self.config.duration_secs * 1000;
        let mut events = Vec::new();

        let mut t = 0;
        while t <= end_ms {
            let ts = Some(self.start + Duration::milliseconds(t as i64));

            if is_tick(t, self.config.signal_interval_ms) {
                events.push(DeviceEvent::signal(SignalKind::Attention, attention_at(t), ts));
                events.push(DeviceEvent::signal(SignalKind::Meditation, meditation_at(t), ts));
                let poor = self.poor_signal();
                events.push(DeviceEvent::signal(SignalKind::PoorSignal, poor, ts));
            }

            if is_tick(t, self.config.eeg_interval_ms) {
                let bands = self.band_powers();
                events.push(DeviceEvent::eeg_power(&bands, ts));
            }

            if t > 0 && is_tick(t, self.config.throw_interval_ms) {
                let hit = self.rng.gen_bool(self.config.hit_rate.clamp(0.0, 1.0));
                let big = hit && self.rng.gen_bool(self.config.big_hit_rate.clamp(0.0, 1.0));
                events.push(DeviceEvent::throw(hit && !big, big, ts));
            }

            t += self.step_ms();
        }

        events
    }

    /// Smallest positive interval among the configured streams
    fn step_ms(&self) -> u64 {
        [
            self.config.signal_interval_ms,
            self.config.eeg_interval_ms,
            self.config.throw_interval_ms,
        ]
        .into_iter()
        .filter(|ms| *ms > 0)
        .fold(None, |acc: Option<u64>, ms| Some(acc.map_or(ms, |a| gcd(a, ms))))
        .unwrap_or(1000)
    }

    /// Mostly good contact (below 50), occasionally anywhere up to 200
    fn poor_signal(&mut self) -> f64 {
        if self.rng.gen_bool(0.8) {
            self.rng.gen_range(0..50) as f64
        } else {
            self.rng.gen_range(0..200) as f64
        }
    }

    fn band_powers(&mut self) -> Vec<(Band, f64)> {
        BAND_RANGES
            .iter()
            .map(|(band, max)| (*band, self.rng.gen_range(0.0..*max).floor()))
            .collect()
    }
}

fn is_tick(t: u64, interval: u64) -> bool {
    interval > 0 && t % interval == 0
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// 70 +/- 20 over a 10 second period
fn attention_at(t_ms: u64) -> f64 {
    let phase = (t_ms % 10_000) as f64 / 10_000.0 * std::f64::consts::TAU;
    (70.0 + 20.0 * phase.sin()).floor().clamp(0.0, 100.0)
}

/// 60 +/- 15 over a 12 second period, cosine
fn meditation_at(t_ms: u64) -> f64 {
    let phase = (t_ms % 12_000) as f64 / 12_000.0 * std::f64::consts::TAU;
    (60.0 + 15.0 * phase.cos()).floor().clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_same_seed_same_stream() {
        let a = Simulator::new(SimulationConfig::default(), 42, start()).generate();
        let b = Simulator::new(SimulationConfig::default(), 42, start()).generate();
        assert_eq!(a, b);
    }

    #[test]
    fn test_event_counts() {
        let config = SimulationConfig {
            duration_secs: 30,
            ..SimulationConfig::default()
        };
        let events = Simulator::new(config, 1, start()).generate();

        let signals = events.iter().filter(|e| e.kind_name() == "signal").count();
        let eeg = events.iter().filter(|e| e.kind_name() == "eeg_power").count();
        let throws = events.iter().filter(|e| e.kind_name() == "throw").count();
        // ticks at 0..=30 seconds
        assert_eq!(signals, 31 * 3);
        assert_eq!(eeg, 31);
        assert_eq!(throws, 2);
    }

    #[test]
    fn test_stream_scores_cleanly() {
        let mut session = Session::default();
        for event in Simulator::new(SimulationConfig::default(), 7, start()).generate() {
            assert!(event.validate().is_ok());
            session.ingest(&event);
        }

        assert_eq!(session.attention().len(), 30);
        assert!(session.attention().iter().all(|v| (50.0..=90.0).contains(v)));
        assert_eq!(session.bands().values(Band::Theta).len(), 91);
        assert_eq!(session.throw_count(), 6);
        assert_eq!(session.elapsed_secs(), 90);
    }

    #[test]
    fn test_waveforms() {
        assert_eq!(attention_at(0), 70.0);
        assert_eq!(attention_at(2_500), 90.0);
        assert_eq!(meditation_at(0), 75.0);
        assert_eq!(meditation_at(6_000), 45.0);
    }
}
