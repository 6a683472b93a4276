//! Pipeline orchestration
//!
//! This module provides the public API for session processing. Device events
//! flow through ingestion into the session buffers; at the end of the session
//! the buffers are scored, encoded into a report and handed to storage.

use crate::config::GameConfig;
use crate::error::ComputeError;
use crate::metrics::MetricScorer;
use crate::report::ReportEncoder;
use crate::schema::{DeviceEvent, EventAdapter};
use crate::session::{Ingested, Session};
use crate::store::RecordStore;
use crate::types::{MetricScores, SessionReport};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Score a recorded event stream (stateless, one-shot).
///
/// # Arguments
/// * `input` - Device events as NDJSON or a JSON array
/// * `config` - Game configuration
/// * `user_name` - Player name stored on the record
///
/// # Returns
/// Report JSON string
pub fn events_to_report(
    input: &str,
    config: &GameConfig,
    user_name: &str,
) -> Result<String, ComputeError> {
    let events = EventAdapter::parse_auto(input)?;
    if events.is_empty() {
        return Err(ComputeError::NoEvents);
    }

    let mut processor = SessionProcessor::with_config(config.clone())?;
    processor.ingest_all(&events);

    let report = processor.report(user_name, None);
    serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
}

/// Tally of an ingested batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub stored: usize,
    pub discarded: usize,
    pub ignored: usize,
    pub throws: usize,
    pub bounced: usize,
}

/// Stateful processor for one live session.
///
/// Owns the session buffers, the report encoder and the random source used by
/// the score capper.
pub struct SessionProcessor {
    config: GameConfig,
    session: Session,
    encoder: ReportEncoder,
    rng: StdRng,
}

impl Default for SessionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProcessor {
    /// Create a processor with the default game configuration
    pub fn new() -> Self {
        let config = GameConfig::default();
        Self {
            session: Session::new(&config),
            config,
            encoder: ReportEncoder::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a processor with a specific game configuration
    pub fn with_config(config: GameConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            session: Session::new(&config),
            config,
            encoder: ReportEncoder::new(),
            rng: StdRng::from_entropy(),
        })
    }

    /// Use a fixed seed for the score capper
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Apply one device event to the session
    pub fn ingest(&mut self, event: &DeviceEvent) -> Ingested {
        self.session.ingest(event)
    }

    /// Parse and apply one JSON-encoded device event
    pub fn ingest_json(&mut self, json: &str) -> Result<Ingested, ComputeError> {
        let event: DeviceEvent = serde_json::from_str(json)
            .map_err(|e| ComputeError::ParseError(e.to_string()))?;
        Ok(self.ingest(&event))
    }

    /// Apply a batch of events in order
    pub fn ingest_all(&mut self, events: &[DeviceEvent]) -> IngestSummary {
        let mut summary = IngestSummary::default();
        for event in events {
            match self.ingest(event) {
                Ingested::Stored(n) => summary.stored += n,
                Ingested::Discarded => summary.discarded += 1,
                Ingested::Ignored => summary.ignored += 1,
                Ingested::Throw { .. } => summary.throws += 1,
                Ingested::ThrowBounced => summary.bounced += 1,
            }
        }
        log::debug!("ingested batch of {} events: {:?}", events.len(), summary);
        summary
    }

    /// Current capped metrics, without ending the session
    pub fn scores(&mut self) -> MetricScores {
        MetricScorer::score_capped(
            self.session.bands(),
            self.session.attention(),
            &mut self.rng,
        )
    }

    /// Build the report for the current session without persisting or resetting.
    ///
    /// `completion_time` defaults to the span of timestamped events.
    pub fn report(&mut self, user_name: &str, completion_time: Option<u64>) -> SessionReport {
        let completion_time = completion_time.unwrap_or_else(|| self.session.elapsed_secs());
        self.encoder.encode(
            &self.session,
            &self.config,
            user_name,
            completion_time,
            &mut self.rng,
        )
    }

    /// End the session: build the report, save its record, then reset.
    ///
    /// A storage failure is returned once with no retry; the session is left
    /// as it was so the caller can try again or export it.
    pub fn finish<S: RecordStore + ?Sized>(
        &mut self,
        user_name: &str,
        completion_time: Option<u64>,
        store: &mut S,
    ) -> Result<SessionReport, ComputeError> {
        let report = self.report(user_name, completion_time);

        if let Err(e) = store.save(&report.record) {
            log::warn!("failed to save game record for {user_name}: {e}");
            return Err(ComputeError::Storage(e.to_string()));
        }

        log::info!(
            "session finished: {} throws, {} hits, score {}",
            report.record.throw_count,
            report.record.success_count,
            report.record.score
        );
        self.reset();
        Ok(report)
    }

    /// Discard the session and start over
    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Save session state to JSON for suspend/resume
    pub fn save_session(&self) -> Result<String, ComputeError> {
        self.session
            .to_json()
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Load session state from JSON.
    ///
    /// The saved session must have been sized by the same window and throw
    /// interval as this processor's config.
    pub fn load_session(&mut self, json: &str) -> Result<(), ComputeError> {
        let session =
            Session::from_json(json).map_err(|e| ComputeError::ParseError(e.to_string()))?;

        if session.signal_window() != self.config.signal_window
            || session.min_throw_interval_ms() != self.config.min_throw_interval_ms
        {
            return Err(ComputeError::InvalidConfig(format!(
                "saved session has signal_window {} and min_throw_interval_ms {}, expected {} and {}",
                session.signal_window(),
                session.min_throw_interval_ms(),
                self.config.signal_window,
                self.config.min_throw_interval_ms
            )));
        }

        self.session = session;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryRecordStore, StoreError};
    use crate::types::GameRecord;
    use chrono::{DateTime, Utc};

    fn sample_events_ndjson() -> &'static str {
        r#"
{"kind":"signal","signal":"ATTENTION","value":80,"timestamp":"2024-05-01T10:00:00Z"}
{"kind":"signal","signal":"MEDITATION","value":60,"timestamp":"2024-05-01T10:00:00Z"}
{"kind":"signal","signal":"ATTENTION","value":90,"timestamp":"2024-05-01T10:00:01Z"}
{"kind":"signal","signal":"MEDITATION","value":"oops","timestamp":"2024-05-01T10:00:01Z"}
{"kind":"eeg_power","theta":1000,"lowGamma":4000,"timestamp":"2024-05-01T10:00:02Z"}
{"kind":"throw","cast":true,"timestamp":"2024-05-01T10:00:10Z"}
{"kind":"throw","castbig":true,"timestamp":"2024-05-01T10:00:20Z"}
{"kind":"throw","cast":true,"timestamp":"2024-05-01T10:00:20.400Z"}
{"kind":"throw","cast":false,"timestamp":"2024-05-01T10:01:30Z"}
"#
    }

    struct FailingStore;

    impl RecordStore for FailingStore {
        fn save(&mut self, _record: &GameRecord) -> Result<(), StoreError> {
            Err(StoreError("database is locked".to_string()))
        }

        fn list(&self) -> Result<Vec<GameRecord>, StoreError> {
            Ok(Vec::new())
        }

        fn delete(&mut self, _timestamp: DateTime<Utc>) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    fn loaded_processor() -> SessionProcessor {
        let mut processor = SessionProcessor::new().with_seed(11);
        let events = EventAdapter::parse_ndjson(sample_events_ndjson()).unwrap();
        processor.ingest_all(&events);
        processor
    }

    #[test]
    fn test_ingest_all_summary() {
        let mut processor = SessionProcessor::new();
        let events = EventAdapter::parse_ndjson(sample_events_ndjson()).unwrap();
        let summary = processor.ingest_all(&events);

        assert_eq!(
            summary,
            IngestSummary {
                stored: 5,
                discarded: 1,
                ignored: 0,
                throws: 4,
                bounced: 0,
            }
        );
    }

    #[test]
    fn test_ingest_all_with_throw_debounce() {
        let config = GameConfig {
            min_throw_interval_ms: 1000,
            ..GameConfig::default()
        };
        let mut processor = SessionProcessor::with_config(config).unwrap();
        let events = EventAdapter::parse_ndjson(sample_events_ndjson()).unwrap();
        let summary = processor.ingest_all(&events);

        assert_eq!(summary.throws, 3);
        assert_eq!(summary.bounced, 1);
        assert_eq!(processor.session().success_count(), 2);
    }

    #[test]
    fn test_events_to_report() {
        let json =
            events_to_report(sample_events_ndjson(), &GameConfig::default(), "player").unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(report["record"]["throwCount"], 4);
        assert_eq!(report["record"]["successCount"], 3);
        assert_eq!(report["record"]["accuracy"], 60);
        assert_eq!(report["record"]["score"], 700);
        assert_eq!(report["record"]["completionTime"], 90);
        assert_eq!(report["percentile_position"], 95);
    }

    #[test]
    fn test_events_to_report_empty_input() {
        let result = events_to_report("\n\n", &GameConfig::default(), "player");
        assert!(matches!(result, Err(ComputeError::NoEvents)));
    }

    #[test]
    fn test_finish_saves_and_resets() {
        let mut processor = loaded_processor();
        let mut store = MemoryRecordStore::new();

        let report = processor.finish("player", Some(75), &mut store).unwrap();
        assert_eq!(report.record.completion_time, 75);
        assert_eq!(store.len(), 1);
        assert_eq!(store.list().unwrap()[0], report.record);
        assert!(processor.session().is_empty());
    }

    #[test]
    fn test_finish_storage_failure_keeps_session() {
        let mut processor = loaded_processor();
        let before = processor.session().clone();

        let result = processor.finish("player", None, &mut FailingStore);
        assert!(matches!(result, Err(ComputeError::Storage(msg)) if msg.contains("locked")));
        assert_eq!(processor.session(), &before);
    }

    #[test]
    fn test_scores_are_capped() {
        let mut processor = SessionProcessor::new().with_seed(5);
        for band in ["theta", "delta", "lowAlpha"] {
            processor
                .ingest_json(&format!(r#"{{"kind":"eeg_power","{band}":10}}"#))
                .unwrap();
        }
        let scores = processor.scores();
        assert!((97..=99).contains(&scores.coordination));
    }

    #[test]
    fn test_ingest_json_rejects_malformed() {
        let mut processor = SessionProcessor::new();
        let result = processor.ingest_json("{\"kind\":\"teleport\"}");
        assert!(matches!(result, Err(ComputeError::ParseError(_))));
    }

    #[test]
    fn test_save_and_load_session() {
        let processor = loaded_processor();
        let saved = processor.save_session().unwrap();

        let mut restored = SessionProcessor::new();
        restored.load_session(&saved).unwrap();
        assert_eq!(restored.session(), processor.session());
        assert_eq!(restored.session().throw_count(), 4);
    }

    #[test]
    fn test_load_session_rejects_other_config() {
        let saved = loaded_processor().save_session().unwrap();

        let config = GameConfig {
            signal_window: 10,
            ..GameConfig::default()
        };
        let mut restored = SessionProcessor::with_config(config).unwrap();
        let result = restored.load_session(&saved);

        assert!(matches!(result, Err(ComputeError::InvalidConfig(msg)) if msg.contains("signal_window")));
        assert!(restored.session().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GameConfig {
            max_throws: 0,
            ..GameConfig::default()
        };
        assert!(matches!(
            SessionProcessor::with_config(config),
            Err(ComputeError::InvalidConfig(_))
        ));
    }
}
