//! Sample buffers
//!
//! Rolling series of headset readings for one session. Attention, meditation and
//! poor-signal series keep a bounded window; band-power series grow for the
//! whole session.

use crate::types::Band;
use serde::{Deserialize, Serialize};

/// Ordered sequence of finite readings for one signal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSeries {
    values: Vec<f64>,
    /// Oldest entries are evicted once this many are held
    capacity: Option<usize>,
}

impl SampleSeries {
    /// Series that keeps at most `capacity` of the most recent values
    pub fn bounded(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity + 1),
            capacity: Some(capacity),
        }
    }

    /// Series that keeps every value
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Append a reading. Non-finite values are rejected and `false` returned.
    pub fn push(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }

        self.values.push(value);
        if let Some(capacity) = self.capacity {
            if self.values.len() > capacity {
                let excess = self.values.len() - capacity;
                self.values.drain(..excess);
            }
        }
        true
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// One unbounded series per EEG band
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandBuffers {
    delta: SampleSeries,
    theta: SampleSeries,
    low_alpha: SampleSeries,
    high_alpha: SampleSeries,
    low_beta: SampleSeries,
    high_beta: SampleSeries,
    low_gamma: SampleSeries,
    mid_gamma: SampleSeries,
}

impl BandBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self, band: Band) -> &SampleSeries {
        match band {
            Band::Delta => &self.delta,
            Band::Theta => &self.theta,
            Band::LowAlpha => &self.low_alpha,
            Band::HighAlpha => &self.high_alpha,
            Band::LowBeta => &self.low_beta,
            Band::HighBeta => &self.high_beta,
            Band::LowGamma => &self.low_gamma,
            Band::MidGamma => &self.mid_gamma,
        }
    }

    fn series_mut(&mut self, band: Band) -> &mut SampleSeries {
        match band {
            Band::Delta => &mut self.delta,
            Band::Theta => &mut self.theta,
            Band::LowAlpha => &mut self.low_alpha,
            Band::HighAlpha => &mut self.high_alpha,
            Band::LowBeta => &mut self.low_beta,
            Band::HighBeta => &mut self.high_beta,
            Band::LowGamma => &mut self.low_gamma,
            Band::MidGamma => &mut self.mid_gamma,
        }
    }

    /// Readings for one band
    pub fn values(&self, band: Band) -> &[f64] {
        self.series(band).as_slice()
    }

    /// Append a reading to one band; see [`SampleSeries::push`]
    pub fn push(&mut self, band: Band, value: f64) -> bool {
        self.series_mut(band).push(value)
    }

    /// Two bands' readings joined end to end (e.g. low + high alpha)
    pub fn concat(&self, first: Band, second: Band) -> Vec<f64> {
        let mut joined = self.values(first).to_vec();
        joined.extend_from_slice(self.values(second));
        joined
    }

    /// Total readings across all bands
    pub fn total_samples(&self) -> usize {
        Band::ALL.iter().map(|band| self.series(*band).len()).sum()
    }

    pub fn clear(&mut self) {
        for band in Band::ALL {
            self.series_mut(band).clear();
        }
    }
}
