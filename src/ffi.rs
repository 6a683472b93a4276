//! FFI bindings for mindcast
//!
//! This module provides C-compatible functions for calling mindcast from the
//! mobile host. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `mindcast_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::GameConfig;
use crate::pipeline::{events_to_report, SessionProcessor};
use crate::store::{MemoryRecordStore, RecordStore};
use chrono::{DateTime, Utc};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Parse an optional config pointer; NULL means defaults
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<GameConfig, String> {
    match cstr_to_string(config_json) {
        Some(json) => GameConfig::from_json(&json).map_err(|e| e.to_string()),
        None => Ok(GameConfig::default()),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Score a recorded event stream (NDJSON or JSON array) and return report JSON.
///
/// # Safety
/// - `events` and `user_name` must be valid null-terminated C strings.
/// - `config_json` may be NULL to use the default game configuration.
/// - Returns a newly allocated string that must be freed with `mindcast_free_string`.
/// - Returns NULL on error; call `mindcast_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mindcast_events_to_report(
    events: *const c_char,
    config_json: *const c_char,
    user_name: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(events_str) = cstr_to_string(events) else {
        set_last_error("Invalid events string pointer");
        return ptr::null_mut();
    };

    let Some(user) = cstr_to_string(user_name) else {
        set_last_error("Invalid user_name string pointer");
        return ptr::null_mut();
    };

    let config = match config_from_ptr(config_json) {
        Ok(config) => config,
        Err(e) => {
            set_last_error(&e);
            return ptr::null_mut();
        }
    };

    match events_to_report(&events_str, &config, &user) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Session API
// ============================================================================

/// Opaque handle to a live session.
///
/// Finished records are kept in an in-memory store until the host drains them
/// with `mindcast_session_records` or removes one with
/// `mindcast_session_delete_record`.
pub struct MindcastSessionHandle {
    processor: SessionProcessor,
    store: MemoryRecordStore,
}

/// Create a new session.
///
/// # Safety
/// - `config_json` may be NULL to use the default game configuration.
/// - Returns a pointer that must be freed with `mindcast_session_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn mindcast_session_new(
    config_json: *const c_char,
) -> *mut MindcastSessionHandle {
    clear_last_error();

    let processor = match config_from_ptr(config_json)
        .and_then(|config| SessionProcessor::with_config(config).map_err(|e| e.to_string()))
    {
        Ok(processor) => processor,
        Err(e) => {
            set_last_error(&e);
            return ptr::null_mut();
        }
    };

    let handle = Box::new(MindcastSessionHandle {
        processor,
        store: MemoryRecordStore::new(),
    });
    Box::into_raw(handle)
}

/// Free a session.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mindcast_session_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn mindcast_session_free(session: *mut MindcastSessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Ingest one JSON device event.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mindcast_session_new`.
/// - `event_json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn mindcast_session_ingest(
    session: *mut MindcastSessionHandle,
    event_json: *const c_char,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let Some(json) = cstr_to_string(event_json) else {
        set_last_error("Invalid event string pointer");
        return -1;
    };

    let handle = &mut *session;
    match handle.processor.ingest_json(&json) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Current capped metrics as JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mindcast_session_new`.
/// - Returns a newly allocated string that must be freed with `mindcast_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mindcast_session_scores(session: *mut MindcastSessionHandle) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *session;
    let scores = handle.processor.scores();
    match serde_json::to_string(&scores) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Finish the session: score, store the record, reset, and return report JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mindcast_session_new`.
/// - `user_name` must be a valid null-terminated C string.
/// - `completion_time_secs` < 0 derives the completion time from event timestamps.
/// - Returns a newly allocated string that must be freed with `mindcast_free_string`.
/// - Returns NULL on error; the session is left unchanged.
#[no_mangle]
pub unsafe extern "C" fn mindcast_session_finish(
    session: *mut MindcastSessionHandle,
    user_name: *const c_char,
    completion_time_secs: i64,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let Some(user) = cstr_to_string(user_name) else {
        set_last_error("Invalid user_name string pointer");
        return ptr::null_mut();
    };

    let completion_time = u64::try_from(completion_time_secs).ok();
    let handle = &mut *session;

    let report = match handle
        .processor
        .finish(&user, completion_time, &mut handle.store)
    {
        Ok(report) => report,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match serde_json::to_string(&report) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Take the records finished in this session handle, newest first, as a JSON array.
///
/// The records are removed from the handle; a second call returns only records
/// finished since.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mindcast_session_new`.
/// - Returns a newly allocated string that must be freed with `mindcast_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mindcast_session_records(
    session: *mut MindcastSessionHandle,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *session;
    let records = handle.store.drain();

    match serde_json::to_string(&records) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            // hand the records back so they are not lost
            for record in &records {
                let _ = handle.store.save(record);
            }
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Delete the record finished at `timestamp` (RFC 3339).
///
/// # Safety
/// - `session` must be a valid pointer returned by `mindcast_session_new`.
/// - `timestamp` must be a valid null-terminated C string.
/// - Returns 1 if a record was deleted, 0 if none matched, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn mindcast_session_delete_record(
    session: *mut MindcastSessionHandle,
    timestamp: *const c_char,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let Some(ts_str) = cstr_to_string(timestamp) else {
        set_last_error("Invalid timestamp string pointer");
        return -1;
    };

    let ts = match DateTime::parse_from_rfc3339(&ts_str) {
        Ok(ts) => ts.with_timezone(&Utc),
        Err(e) => {
            set_last_error(&format!("Invalid timestamp: {}", e));
            return -1;
        }
    };

    match (*session).store.delete(ts) {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Reset the session, discarding all buffered data.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mindcast_session_new`.
#[no_mangle]
pub unsafe extern "C" fn mindcast_session_reset(session: *mut MindcastSessionHandle) {
    if !session.is_null() {
        (*session).processor.reset();
    }
}

/// Save session state to JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mindcast_session_new`.
/// - Returns a newly allocated string that must be freed with `mindcast_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mindcast_session_save(session: *mut MindcastSessionHandle) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    match (*session).processor.save_session() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Load session state from JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `mindcast_session_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn mindcast_session_load(
    session: *mut MindcastSessionHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return -1;
    };

    match (*session).processor.load_session(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Free a string returned by mindcast.
///
/// # Safety
/// - `ptr` must be a pointer returned by a mindcast function, or NULL.
#[no_mangle]
pub unsafe extern "C" fn mindcast_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Last error message for this thread, or NULL.
///
/// # Safety
/// - The returned pointer is owned by mindcast and valid until the next call on this thread.
#[no_mangle]
pub unsafe extern "C" fn mindcast_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Library version string.
///
/// # Safety
/// - The returned pointer is static and must not be freed.
#[no_mangle]
pub unsafe extern "C" fn mindcast_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_events() -> CString {
        CString::new(
            r#"[
                {"kind":"signal","signal":"ATTENTION","value":72,"timestamp":"2024-05-01T10:00:00Z"},
                {"kind":"eeg_power","theta":2000,"lowBeta":3000,"timestamp":"2024-05-01T10:00:01Z"},
                {"kind":"throw","cast":true,"timestamp":"2024-05-01T10:00:05Z"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_events_to_report() {
        let events = sample_events();
        let user = CString::new("player").unwrap();

        unsafe {
            let result = mindcast_events_to_report(events.as_ptr(), ptr::null(), user.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("report_version"));
            assert!(result_str.contains("\"successCount\": 1"));

            mindcast_free_string(result);
        }
    }

    #[test]
    fn test_ffi_session_lifecycle() {
        unsafe {
            let session = mindcast_session_new(ptr::null());
            assert!(!session.is_null());

            let attention =
                CString::new(r#"{"kind":"signal","signal":"ATTENTION","value":88}"#).unwrap();
            assert_eq!(mindcast_session_ingest(session, attention.as_ptr()), 0);

            let throw = CString::new(r#"{"kind":"throw","castbig":true}"#).unwrap();
            assert_eq!(mindcast_session_ingest(session, throw.as_ptr()), 0);

            let scores = mindcast_session_scores(session);
            assert!(!scores.is_null());
            mindcast_free_string(scores);

            // Save and restore into a second session
            let saved = mindcast_session_save(session);
            assert!(!saved.is_null());
            let session2 = mindcast_session_new(ptr::null());
            assert_eq!(mindcast_session_load(session2, saved), 0);
            mindcast_free_string(saved);

            let user = CString::new("player").unwrap();
            let report = mindcast_session_finish(session, user.as_ptr(), 60);
            assert!(!report.is_null());
            let report_str = CStr::from_ptr(report).to_str().unwrap();
            assert!(report_str.contains("\"score\":500"));
            mindcast_free_string(report);

            let records = mindcast_session_records(session);
            let records_str = CStr::from_ptr(records).to_str().unwrap();
            assert!(records_str.starts_with('['));
            assert!(records_str.contains("\"completionTime\":60"));
            mindcast_free_string(records);

            // records were handed over; nothing is left behind
            let drained = mindcast_session_records(session);
            assert_eq!(CStr::from_ptr(drained).to_str().unwrap(), "[]");
            mindcast_free_string(drained);

            mindcast_session_reset(session2);
            mindcast_session_free(session);
            mindcast_session_free(session2);
        }
    }

    #[test]
    fn test_ffi_delete_record() {
        unsafe {
            let session = mindcast_session_new(ptr::null());
            let throw = CString::new(r#"{"kind":"throw","cast":true}"#).unwrap();
            assert_eq!(mindcast_session_ingest(session, throw.as_ptr()), 0);

            let user = CString::new("player").unwrap();
            let report = mindcast_session_finish(session, user.as_ptr(), -1);
            let report_json: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(report).to_str().unwrap()).unwrap();
            mindcast_free_string(report);

            let timestamp =
                CString::new(report_json["record"]["timestamp"].as_str().unwrap()).unwrap();
            assert_eq!(mindcast_session_delete_record(session, timestamp.as_ptr()), 1);
            assert_eq!(mindcast_session_delete_record(session, timestamp.as_ptr()), 0);

            let records = mindcast_session_records(session);
            assert_eq!(CStr::from_ptr(records).to_str().unwrap(), "[]");
            mindcast_free_string(records);

            let garbage = CString::new("yesterday").unwrap();
            assert_eq!(mindcast_session_delete_record(session, garbage.as_ptr()), -1);

            mindcast_session_free(session);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let bad_config = CString::new(r#"{"max_throws":0}"#).unwrap();
            let session = mindcast_session_new(bad_config.as_ptr());
            assert!(session.is_null());

            let error = mindcast_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("max_throws"));

            let session = mindcast_session_new(ptr::null());
            let garbage = CString::new("not json").unwrap();
            assert_eq!(mindcast_session_ingest(session, garbage.as_ptr()), -1);
            assert!(!mindcast_last_error().is_null());
            mindcast_session_free(session);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = mindcast_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
