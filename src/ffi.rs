//! FFI bindings for Presence Flux
//!
//! This module provides C-compatible functions for driving an engine from
//! other languages. Strings returned by these functions are allocated here
//! and must be freed by the caller using `presence_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::engine::BehaviorEngine;
use crate::landmarks::LandmarkFrame;
use crate::types::Status;

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

// ============================================================================
// Engine API
// ============================================================================

/// Opaque handle to an engine for one session
pub struct PresenceEngineHandle {
    engine: BehaviorEngine,
}

/// Create an engine.
///
/// # Safety
/// - `config_json` must be NULL (defaults) or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `presence_engine_free`.
/// - Returns NULL on error; call `presence_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn presence_engine_new(config_json: *const c_char) -> *mut PresenceEngineHandle {
    clear_last_error();

    let engine = if config_json.is_null() {
        Ok(BehaviorEngine::new())
    } else {
        match cstr_to_string(config_json) {
            Some(json) => EngineConfig::from_json(&json).and_then(BehaviorEngine::with_config),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match engine {
        Ok(engine) => Box::into_raw(Box::new(PresenceEngineHandle { engine })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine, discarding its session state.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `presence_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn presence_engine_free(engine: *mut PresenceEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Process one frame and return the metrics as JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `presence_engine_new`.
/// - `points` must be NULL (no face detected) or point to `point_count * 3`
///   readable f64 values laid out as `x, y, z` triples.
/// - Returns a newly allocated string that must be freed with `presence_free_string`.
/// - Returns NULL on error; call `presence_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn presence_engine_process_frame(
    engine: *mut PresenceEngineHandle,
    points: *const f64,
    point_count: usize,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &mut *engine;

    let frame = if points.is_null() {
        None
    } else {
        let values = std::slice::from_raw_parts(points, point_count.saturating_mul(3));
        Some(LandmarkFrame::from_flat(values))
    };

    let metrics = handle.engine.process_frame(frame.as_ref());
    match metrics.to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Forward the tracker status (0 idle, 1 loading, 2 active, 3 error).
///
/// # Safety
/// - `engine` must be a valid pointer returned by `presence_engine_new`.
/// - `message` must be NULL or a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `presence_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn presence_engine_set_status(
    engine: *mut PresenceEngineHandle,
    status: i32,
    message: *const c_char,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *engine;

    let status = match Status::from_code(status) {
        Some(s) => s,
        None => {
            set_last_error(&format!("Unknown status code: {status}"));
            return -1;
        }
    };

    let message = cstr_to_string(message);
    handle.engine.set_status(status, message.as_deref());
    0
}

/// Return the session summary so far as JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `presence_engine_new`.
/// - Returns a newly allocated string that must be freed with `presence_free_string`.
/// - Returns NULL on error; call `presence_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn presence_engine_summary(engine: *const PresenceEngineHandle) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    match handle.engine.summary_at(chrono::Utc::now()).to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Presence functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Presence function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn presence_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Presence function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn presence_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn presence_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{LandmarkTopology, REFINED_MESH_POINTS};
    use crate::synthetic::SyntheticFace;

    fn flat_face() -> Vec<f64> {
        SyntheticFace::default()
            .render(&LandmarkTopology::default())
            .points()
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect()
    }

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        presence_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_engine_lifecycle() {
        unsafe {
            let engine = presence_engine_new(ptr::null());
            assert!(!engine.is_null());

            let points = flat_face();
            for _ in 0..5 {
                let json = take_string(presence_engine_process_frame(
                    engine,
                    points.as_ptr(),
                    REFINED_MESH_POINTS,
                ));
                assert!(json.contains("eye_contact_pct"));
            }

            // No face: last metrics re-emitted
            let json = take_string(presence_engine_process_frame(engine, ptr::null(), 0));
            let metrics: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(metrics["frames_processed"], 5);

            let summary = take_string(presence_engine_summary(engine));
            let summary: serde_json::Value = serde_json::from_str(&summary).unwrap();
            assert_eq!(summary["frames_processed"], 5);

            presence_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_status_forwarding() {
        unsafe {
            let engine = presence_engine_new(ptr::null());
            let message = CString::new("permission denied").unwrap();
            assert_eq!(presence_engine_set_status(engine, 3, message.as_ptr()), 0);

            let json = take_string(presence_engine_process_frame(engine, ptr::null(), 0));
            let metrics: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(metrics["status"], "error");
            assert_eq!(metrics["alert"]["detail"], "permission denied");

            assert_eq!(presence_engine_set_status(engine, 42, ptr::null()), -1);
            assert!(!presence_last_error().is_null());

            presence_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_custom_config() {
        unsafe {
            let config = CString::new(r#"{ "frame_rate": 60.0 }"#).unwrap();
            let engine = presence_engine_new(config.as_ptr());
            assert!(!engine.is_null());
            presence_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid = CString::new("not json").unwrap();
            let engine = presence_engine_new(invalid.as_ptr());
            assert!(engine.is_null());

            let error = presence_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let result = presence_engine_process_frame(ptr::null_mut(), ptr::null(), 0);
            assert!(result.is_null());
        }
    }

    #[test]
    fn test_ffi_rejects_oversized_window() {
        unsafe {
            let config = CString::new(r#"{ "windows": { "head_motion": 4000000000000000000 } }"#).unwrap();
            let engine = presence_engine_new(config.as_ptr());
            assert!(engine.is_null());

            let error = CStr::from_ptr(presence_last_error()).to_str().unwrap();
            assert!(error.contains("windows.head_motion"));
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = presence_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
