//! Session state
//!
//! One play-through's buffers and throw counters. The state is an explicit
//! value owned by the caller: created at session start, mutated by
//! [`Session::ingest`], and replaced wholesale by [`Session::reset`].

use crate::config::GameConfig;
use crate::schema::{coerce_numeric, DeviceEvent, SignalReading, ThrowReading};
use crate::series::{BandBuffers, SampleSeries};
use crate::types::{SignalKind, ThrowRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What ingestion did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    /// Number of readings appended to buffers
    Stored(usize),
    /// Non-numeric readings dropped; buffers unchanged
    Discarded,
    /// Signal kind the session does not track
    Ignored,
    /// Throw counted
    Throw { success: bool, big: bool },
    /// Throw arrived inside the minimum throw interval and was dropped
    ThrowBounced,
}

/// Session-scoped buffers and counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    attention: SampleSeries,
    meditation: SampleSeries,
    poor_signal: SampleSeries,
    bands: BandBuffers,
    throw_count: u32,
    success_count: u32,
    throw_history: Vec<ThrowRecord>,
    /// Timestamp of the last counted throw that carried one
    last_throw_at: Option<DateTime<Utc>>,
    first_event_at: Option<DateTime<Utc>>,
    last_event_at: Option<DateTime<Utc>>,
    signal_window: usize,
    min_throw_interval_ms: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&GameConfig::default())
    }
}

impl Session {
    /// Empty session sized by the game configuration
    pub fn new(config: &GameConfig) -> Self {
        Self {
            attention: SampleSeries::bounded(config.signal_window),
            meditation: SampleSeries::bounded(config.signal_window),
            poor_signal: SampleSeries::bounded(config.signal_window),
            bands: BandBuffers::new(),
            throw_count: 0,
            success_count: 0,
            throw_history: Vec::new(),
            last_throw_at: None,
            first_event_at: None,
            last_event_at: None,
            signal_window: config.signal_window,
            min_throw_interval_ms: config.min_throw_interval_ms,
        }
    }

    /// Apply one device event
    pub fn ingest(&mut self, event: &DeviceEvent) -> Ingested {
        if let Some(ts) = event.timestamp() {
            self.first_event_at.get_or_insert(ts);
            self.last_event_at = Some(self.last_event_at.map_or(ts, |last| last.max(ts)));
        }

        match event {
            DeviceEvent::Signal(reading) => self.ingest_signal(reading),
            DeviceEvent::EegPower(reading) => {
                let mut stored = 0;
                let mut dropped = 0;
                for (band, value) in reading.present() {
                    if coerce_numeric(value).is_some_and(|v| self.bands.push(band, v)) {
                        stored += 1;
                    } else {
                        dropped += 1;
                        log::debug!("discarding non-numeric {} reading: {}", band.as_str(), value);
                    }
                }
                if stored == 0 && dropped > 0 {
                    Ingested::Discarded
                } else {
                    Ingested::Stored(stored)
                }
            }
            DeviceEvent::Throw(reading) => self.ingest_throw(reading),
        }
    }

    fn ingest_signal(&mut self, reading: &SignalReading) -> Ingested {
        let series = match reading.signal {
            SignalKind::Attention => &mut self.attention,
            SignalKind::Meditation => &mut self.meditation,
            SignalKind::PoorSignal => &mut self.poor_signal,
            SignalKind::Unknown => return Ingested::Ignored,
        };

        if coerce_numeric(&reading.value).is_some_and(|value| series.push(value)) {
            return Ingested::Stored(1);
        }

        log::debug!(
            "discarding non-numeric {:?} value: {}",
            reading.signal,
            reading.value
        );
        Ingested::Discarded
    }

    fn ingest_throw(&mut self, reading: &ThrowReading) -> Ingested {
        if let (Some(ts), Some(last)) = (reading.timestamp, self.last_throw_at) {
            let gap_ms = (ts - last).num_milliseconds();
            if gap_ms >= 0 && (gap_ms as u64) < self.min_throw_interval_ms {
                log::warn!(
                    "dropping throw {gap_ms}ms after the previous one (minimum {}ms)",
                    self.min_throw_interval_ms
                );
                return Ingested::ThrowBounced;
            }
        }
        if reading.timestamp.is_some() {
            self.last_throw_at = reading.timestamp;
        }

        let success = reading.is_success();
        let big = reading.is_big();

        self.throw_count += 1;
        if success {
            self.success_count += 1;
            self.throw_history.push(ThrowRecord {
                success,
                attention: self.attention.last(),
                timestamp: reading.timestamp.unwrap_or_else(Utc::now),
                is_big_throw: big,
            });
        }

        Ingested::Throw { success, big }
    }

    /// Discard all buffers and counters, keeping the configured sizes
    pub fn reset(&mut self) {
        let config = GameConfig {
            signal_window: self.signal_window,
            min_throw_interval_ms: self.min_throw_interval_ms,
            ..GameConfig::default()
        };
        *self = Session::new(&config);
    }

    pub fn attention(&self) -> &[f64] {
        self.attention.as_slice()
    }

    pub fn meditation(&self) -> &[f64] {
        self.meditation.as_slice()
    }

    pub fn poor_signal(&self) -> &[f64] {
        self.poor_signal.as_slice()
    }

    pub fn bands(&self) -> &BandBuffers {
        &self.bands
    }

    pub fn throw_count(&self) -> u32 {
        self.throw_count
    }

    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    pub fn throw_history(&self) -> &[ThrowRecord] {
        &self.throw_history
    }

    pub fn signal_window(&self) -> usize {
        self.signal_window
    }

    pub fn min_throw_interval_ms(&self) -> u64 {
        self.min_throw_interval_ms
    }

    /// Seconds between the first and last timestamped event
    pub fn elapsed_secs(&self) -> u64 {
        match (self.first_event_at, self.last_event_at) {
            (Some(first), Some(last)) => (last - first).num_seconds().max(0) as u64,
            _ => 0,
        }
    }

    /// True when nothing has been ingested since creation or reset
    pub fn is_empty(&self) -> bool {
        self.attention.is_empty()
            && self.meditation.is_empty()
            && self.poor_signal.is_empty()
            && self.bands.total_samples() == 0
            && self.throw_count == 0
    }

    /// Serialize session state for suspend/resume
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore session state
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
