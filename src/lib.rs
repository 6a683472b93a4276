//! Mindcast - On-device scoring engine for EEG focus-puzzle sessions
//!
//! Mindcast turns the raw stream of a consumer EEG headset and a throw accessory
//! into end-of-session brain metrics through a deterministic pipeline:
//! event ingestion → bounded session buffers → normalization → metric scoring
//! → report encoding → record storage.
//!
//! ## Modules
//!
//! - **Session Pipeline**: Ingest device events live or from a recording and score them
//! - **Simulator**: Generate seeded synthetic sessions for demos and tests

pub mod config;
pub mod error;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod scoring;
pub mod series;
pub mod session;
pub mod simulator;
pub mod store;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::GameConfig;
pub use error::ComputeError;
pub use metrics::MetricScorer;
pub use pipeline::{events_to_report, SessionProcessor};
pub use session::Session;
pub use store::{MemoryRecordStore, RecordStore};

// Schema exports
pub use schema::{DeviceEvent, EventAdapter, SCHEMA_VERSION};

/// Mindcast version embedded in all reports
pub const MINDCAST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "mindcast";
