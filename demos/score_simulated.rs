//! Score a synthetic session for validation testing

use chrono::{TimeZone, Utc};
use mindcast::simulator::{SimulationConfig, Simulator};
use mindcast::{GameConfig, MemoryRecordStore, RecordStore, SessionProcessor};

fn main() {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let events = Simulator::new(SimulationConfig::default(), 42, start).generate();

    let mut processor = match SessionProcessor::with_config(GameConfig::default()) {
        Ok(processor) => processor.with_seed(42),
        Err(e) => {
            eprintln!("Error: {e:?}");
            return;
        }
    };
    processor.ingest_all(&events);

    let mut store = MemoryRecordStore::new();
    match processor.finish("demo", None, &mut store) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error: {e:?}"),
        },
        Err(e) => eprintln!("Error: {e:?}"),
    }

    println!("stored records: {}", store.list().map(|r| r.len()).unwrap_or(0));
}
