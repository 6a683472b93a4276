//! Batch parsing and validation of device events

use crate::error::ComputeError;
use crate::schema::device_event::{DeviceEvent, ValidationError};

/// Parses recorded device event streams
pub struct EventAdapter;

impl EventAdapter {
    /// Parse a JSON string containing an array of events
    pub fn parse_array(json: &str) -> Result<Vec<DeviceEvent>, ComputeError> {
        let events: Vec<DeviceEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing events
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<DeviceEvent>, ComputeError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<DeviceEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Parse either format, picking the array parser when input starts with `[`
    pub fn parse_auto(input: &str) -> Result<Vec<DeviceEvent>, ComputeError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate a batch of events, returning only the failures
    pub fn validate_events(events: &[DeviceEvent]) -> Vec<ValidationResult> {
        events
            .iter()
            .enumerate()
            .filter_map(|(index, event)| {
                event.validate().err().map(|error| ValidationResult {
                    index,
                    kind: event.kind_name(),
                    error,
                })
            })
            .collect()
    }
}

/// A single validation failure
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub kind: &'static str,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_NDJSON: &str = r#"
{"kind":"signal","signal":"ATTENTION","value":55}
{"kind":"eeg_power","theta":1200,"delta":3400}

{"kind":"throw","cast":true}
{"kind":"signal","signal":"MEDITATION","value":"n/a"}
"#;

    #[test]
    fn test_parse_ndjson() {
        let events = EventAdapter::parse_ndjson(SAMPLE_NDJSON).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[2].kind_name(), "throw");
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let err = EventAdapter::parse_ndjson("{\"kind\":\"throw\"}\n{oops}").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_auto_detects_array() {
        let events = EventAdapter::parse_auto(
            r#"[{"kind":"throw","castbig":true},{"kind":"signal","signal":"POOR_SIGNAL","value":0}]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 2);

        let events = EventAdapter::parse_auto(SAMPLE_NDJSON).unwrap();
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_validate_events() {
        let events = EventAdapter::parse_ndjson(SAMPLE_NDJSON).unwrap();
        let failures = EventAdapter::validate_events(&events);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 3);
        assert_eq!(failures[0].kind, "signal");
    }
}
