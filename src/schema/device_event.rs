//! Device event schema
//!
//! Events delivered by the host's native bridges, one JSON object each:
//! - `signal`: eSense attention / meditation / poor-signal readings
//! - `eeg_power`: per-band power snapshot from the headset
//! - `throw`: gesture detection from the ESP32 accessory
//!
//! Values arrive loosely typed. Numbers and numeric strings are accepted,
//! anything else is discarded at ingestion.

use crate::types::{Band, SignalKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current device event schema version
pub const SCHEMA_VERSION: &str = "mindcast.device_event.v1";

/// eSense signal reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReading {
    pub signal: SignalKind,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Band power snapshot; every band is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandPowerReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_alpha: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_alpha: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_beta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_beta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_gamma: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid_gamma: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl BandPowerReading {
    /// Raw value carried for a band, if the field was present
    pub fn get(&self, band: Band) -> Option<&Value> {
        match band {
            Band::Delta => self.delta.as_ref(),
            Band::Theta => self.theta.as_ref(),
            Band::LowAlpha => self.low_alpha.as_ref(),
            Band::HighAlpha => self.high_alpha.as_ref(),
            Band::LowBeta => self.low_beta.as_ref(),
            Band::HighBeta => self.high_beta.as_ref(),
            Band::LowGamma => self.low_gamma.as_ref(),
            Band::MidGamma => self.mid_gamma.as_ref(),
        }
    }

    fn slot(&mut self, band: Band) -> &mut Option<Value> {
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

    /// Bands present in this snapshot with their raw values
    pub fn present(&self) -> impl Iterator<Item = (Band, &Value)> + '_ {
        Band::ALL
            .into_iter()
            .filter_map(move |band| self.get(band).map(|value| (band, value)))
    }
}

/// Throw detection; flags are compared against literal `true`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrowReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub castbig: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ThrowReading {
    pub fn is_big(&self) -> bool {
        is_true(self.castbig.as_ref())
    }

    pub fn is_success(&self) -> bool {
        is_true(self.cast.as_ref()) || self.is_big()
    }
}

fn is_true(flag: Option<&Value>) -> bool {
    matches!(flag, Some(Value::Bool(true)))
}

/// A single event from the headset or the accessory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceEvent {
    Signal(SignalReading),
    EegPower(BandPowerReading),
    Throw(ThrowReading),
}

impl DeviceEvent {
    /// Signal event with a numeric value
    pub fn signal(signal: SignalKind, value: f64, timestamp: Option<DateTime<Utc>>) -> Self {
        DeviceEvent::Signal(SignalReading {
            signal,
            value: Value::from(value),
            timestamp,
        })
    }

    /// Band power event from `(band, value)` pairs
    pub fn eeg_power(bands: &[(Band, f64)], timestamp: Option<DateTime<Utc>>) -> Self {
        let mut reading = BandPowerReading {
            timestamp,
            ..Default::default()
        };
        for (band, value) in bands {
            *reading.slot(*band) = Some(Value::from(*value));
        }
        DeviceEvent::EegPower(reading)
    }

    /// Throw event with the accessory's two flags
    pub fn throw(cast: bool, castbig: bool, timestamp: Option<DateTime<Utc>>) -> Self {
        DeviceEvent::Throw(ThrowReading {
            cast: Some(Value::Bool(cast)),
            castbig: Some(Value::Bool(castbig)),
            timestamp,
        })
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            DeviceEvent::Signal(s) => s.timestamp,
            DeviceEvent::EegPower(p) => p.timestamp,
            DeviceEvent::Throw(t) => t.timestamp,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            DeviceEvent::Signal(_) => "signal",
            DeviceEvent::EegPower(_) => "eeg_power",
            DeviceEvent::Throw(_) => "throw",
        }
    }

    /// Check for content that ingestion would silently drop
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            DeviceEvent::Signal(reading) => {
                if reading.signal == SignalKind::Unknown {
                    return Err(ValidationError::UnknownSignal);
                }
                if coerce_numeric(&reading.value).is_none() {
                    return Err(ValidationError::NonNumericValue {
                        field: "value".to_string(),
                    });
                }
                Ok(())
            }
            DeviceEvent::EegPower(reading) => {
                let mut present = reading.present().peekable();
                if present.peek().is_none() {
                    return Err(ValidationError::EmptyBandPower);
                }
                for (band, value) in present {
                    if coerce_numeric(value).is_none() {
                        return Err(ValidationError::NonNumericValue {
                            field: band.as_str().to_string(),
                        });
                    }
                }
                Ok(())
            }
            DeviceEvent::Throw(_) => Ok(()),
        }
    }
}

/// Interpret a loosely typed reading as a finite number.
///
/// Numbers and trimmed numeric strings are accepted. Null, booleans, empty or
/// non-numeric strings, arrays, objects and non-finite results are rejected.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Signal name is not one of ATTENTION, MEDITATION, POOR_SIGNAL")]
    UnknownSignal,

    #[error("Field {field} is not numeric")]
    NonNumericValue { field: String },

    #[error("Band power event carries no bands")]
    EmptyBandPower,
}
