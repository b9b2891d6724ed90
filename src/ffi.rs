//! FFI bindings for Synheart Moments
//!
//! This module provides C-compatible functions for driving the engine from a host
//! UI. All strings are null-terminated C strings; returned strings are newly
//! allocated and must be freed by the caller using `moments_free_string`.
//!
//! Action functions return `0` on success and `-1` on failure; call
//! `moments_last_error` for the message.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::catalog::MomentCatalog;
use crate::config::EngineConfig;
use crate::engine::MomentsEngine;
use crate::error::MomentError;
use crate::types::{HostContext, SessionEvent};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

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

fn to_status(result: Result<SessionEvent, MomentError>) -> c_int {
    match result {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

fn to_json_cstr(result: Result<String, MomentError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Engine lifecycle
// ============================================================================

/// Opaque handle to a MomentsEngine and its jitter source
pub struct MomentsEngineHandle {
    engine: MomentsEngine,
    rng: StdRng,
}

/// Create a new engine.
///
/// # Safety
/// - `config_json` may be NULL (defaults) or a valid null-terminated C string
///   holding an `EngineConfig` JSON object.
/// - `seed` of 0 seeds the metric jitter from entropy.
/// - Must be freed with `moments_engine_free`.
/// - Returns NULL on error; call `moments_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn moments_engine_new(
    config_json: *const c_char,
    seed: u64,
) -> *mut MomentsEngineHandle {
    clear_last_error();

    let engine = if config_json.is_null() {
        MomentsEngine::new()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        let built = EngineConfig::from_json(&json)
            .and_then(|config| MomentsEngine::with_config(config, MomentCatalog::builtin()));
        match built {
            Ok(engine) => engine,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let rng = if seed == 0 {
        StdRng::from_entropy()
    } else {
        StdRng::seed_from_u64(seed)
    };

    Box::into_raw(Box::new(MomentsEngineHandle { engine, rng }))
}

/// Free an engine.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `moments_engine_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn moments_engine_free(handle: *mut MomentsEngineHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Attach the host's user id and health payload.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `moments_engine_new`.
/// - `user_id` and `health_json` may each be NULL or a valid C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn moments_engine_set_context(
    handle: *mut MomentsEngineHandle,
    user_id: *const c_char,
    health_json: *const c_char,
) -> c_int {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let health_data = match cstr_to_string(health_json) {
        Some(json) => match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                set_last_error(&MomentError::from(e).to_string());
                return -1;
            }
        },
        None => None,
    };

    let handle = &mut *handle;
    handle.engine.set_context(HostContext {
        user_id: cstr_to_string(user_id),
        health_data,
    });
    0
}

// ============================================================================
// Ticks
// ============================================================================

/// Run one metric/trigger tick.
///
/// Returns 1 when a moment was proposed, 0 otherwise, -1 on error.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `moments_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn moments_engine_tick_metrics(handle: *mut MomentsEngineHandle) -> c_int {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *handle;
    match handle.engine.tick_metrics(&mut handle.rng) {
        Some(_) => 1,
        None => 0,
    }
}

/// Run one session-second tick.
///
/// Returns 1 when the session changed phase (auto-start or auto-complete),
/// 0 otherwise, -1 on error.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `moments_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn moments_engine_tick_second(handle: *mut MomentsEngineHandle) -> c_int {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *handle;
    match handle.engine.tick_second() {
        Some(_) => 1,
        None => 0,
    }
}

// ============================================================================
// User actions
// ============================================================================

/// Start a catalog moment immediately.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `moments_engine_new`.
/// - `moment_id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn moments_engine_start_now(
    handle: *mut MomentsEngineHandle,
    moment_id: *const c_char,
) -> c_int {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let id = match cstr_to_string(moment_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid moment_id string pointer");
            return -1;
        }
    };

    let handle = &mut *handle;
    to_status(handle.engine.start_now(&id))
}

macro_rules! engine_action {
    ($(#[$doc:meta])* $name:ident => $method:ident) => {
        $(#[$doc])*
        ///
        /// # Safety
        /// - `handle` must be a valid pointer returned by `moments_engine_new`.
        /// - Returns 0 on success, -1 on error.
        #[no_mangle]
        pub unsafe extern "C" fn $name(handle: *mut MomentsEngineHandle) -> c_int {
            clear_last_error();

            if handle.is_null() {
                set_last_error("Null engine pointer");
                return -1;
            }

            let handle = &mut *handle;
            to_status(handle.engine.$method())
        }
    };
}

engine_action!(
    /// Start a proposed moment before its auto-start delay.
    moments_engine_accept => accept
);
engine_action!(
    /// Pause the running session.
    moments_engine_pause => pause
);
engine_action!(
    /// Resume the paused session.
    moments_engine_resume => resume
);
engine_action!(
    /// Complete the session early, recording the elapsed time.
    moments_engine_complete => complete
);
engine_action!(
    /// Skip the session or dismiss a proposal.
    moments_engine_skip => skip
);

// ============================================================================
// Output
// ============================================================================

/// Current view snapshot as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `moments_engine_new`.
/// - Returns a newly allocated string that must be freed with `moments_free_string`.
/// - Returns NULL on error; call `moments_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn moments_engine_snapshot(handle: *mut MomentsEngineHandle) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*handle;
    to_json_cstr(handle.engine.snapshot_json())
}

/// Completed-session history as a JSON array.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `moments_engine_new`.
/// - Returns a newly allocated string that must be freed with `moments_free_string`.
/// - Returns NULL on error; call `moments_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn moments_engine_history(handle: *mut MomentsEngineHandle) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*handle;
    to_json_cstr(handle.engine.history_json())
}

/// Built-in moment catalog as a JSON array.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `moments_free_string`.
#[no_mangle]
pub unsafe extern "C" fn moments_catalog_json() -> *mut c_char {
    clear_last_error();
    to_json_cstr(MomentCatalog::builtin().to_json())
}

// ============================================================================
// Memory and errors
// ============================================================================

/// Free a string returned by any Moments FFI function.
///
/// # Safety
/// - `s` must be a pointer returned by a Moments FFI function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn moments_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local string; do NOT free it.
/// - The pointer is valid until the next Moments FFI call on the same thread.
/// - Returns NULL if there was no error.
#[no_mangle]
pub unsafe extern "C" fn moments_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Get the Moments version string.
///
/// # Safety
/// - Returns a pointer to a static string; do NOT free it.
#[no_mangle]
pub unsafe extern "C" fn moments_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        moments_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_engine_lifecycle() {
        unsafe {
            let engine = moments_engine_new(ptr::null(), 17);
            assert!(!engine.is_null());

            let id = CString::new("neck-release").unwrap();
            assert_eq!(moments_engine_start_now(engine, id.as_ptr()), 0);
            assert_eq!(moments_engine_pause(engine), 0);
            assert_eq!(moments_engine_resume(engine), 0);

            for _ in 0..44 {
                assert_eq!(moments_engine_tick_second(engine), 0);
            }
            assert_eq!(moments_engine_tick_second(engine), 1);

            let history = take_string(moments_engine_history(engine));
            let value: serde_json::Value = serde_json::from_str(&history).unwrap();
            assert_eq!(value.as_array().unwrap().len(), 1);
            assert_eq!(value[0]["actual_duration_secs"], 45);

            moments_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_complete_early_and_skip() {
        unsafe {
            let engine = moments_engine_new(ptr::null(), 23);
            let id = CString::new("box-breathing").unwrap();

            assert_eq!(moments_engine_start_now(engine, id.as_ptr()), 0);
            for _ in 0..30 {
                assert_eq!(moments_engine_tick_second(engine), 0);
            }
            assert_eq!(moments_engine_complete(engine), 0);

            let history = take_string(moments_engine_history(engine));
            let value: serde_json::Value = serde_json::from_str(&history).unwrap();
            assert_eq!(value.as_array().unwrap().len(), 1);
            assert_eq!(value[0]["actual_duration_secs"], 30);
            assert_eq!(value[0]["moment"]["id"], "box-breathing");

            // Nothing left to complete
            assert_eq!(moments_engine_complete(engine), -1);

            assert_eq!(moments_engine_start_now(engine, id.as_ptr()), 0);
            for _ in 0..10 {
                moments_engine_tick_second(engine);
            }
            assert_eq!(moments_engine_skip(engine), 0);

            let history = take_string(moments_engine_history(engine));
            let value: serde_json::Value = serde_json::from_str(&history).unwrap();
            assert_eq!(value.as_array().unwrap().len(), 1);

            let snapshot = take_string(moments_engine_snapshot(engine));
            let value: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
            assert_eq!(value["phase"], "idle");

            moments_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_snapshot_and_context() {
        unsafe {
            let engine = moments_engine_new(ptr::null(), 1);
            let user = CString::new("user-7").unwrap();
            let health = CString::new(r#"{"resting_hr": 58}"#).unwrap();
            assert_eq!(
                moments_engine_set_context(engine, user.as_ptr(), health.as_ptr()),
                0
            );

            let snapshot = take_string(moments_engine_snapshot(engine));
            let value: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
            assert_eq!(value["context"]["user_id"], "user-7");
            assert_eq!(value["context"]["health_data"]["resting_hr"], 58);
            assert_eq!(value["phase"], "idle");

            moments_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_config_json() {
        unsafe {
            let config = CString::new(r#"{"stress_threshold": 0.0}"#).unwrap();
            let engine = moments_engine_new(config.as_ptr(), 9);
            assert!(!engine.is_null());

            // Stress is always above zero after a tick, so a proposal follows
            assert_eq!(moments_engine_tick_metrics(engine), 1);
            assert_eq!(moments_engine_accept(engine), 0);

            moments_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let engine = moments_engine_new(ptr::null(), 3);
            assert_eq!(moments_engine_pause(engine), -1);

            let error = moments_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("pause"));

            let bad = CString::new("not json").unwrap();
            assert!(moments_engine_new(bad.as_ptr(), 0).is_null());
            assert!(!moments_last_error().is_null());

            assert_eq!(moments_engine_skip(ptr::null_mut()), -1);

            moments_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_catalog_and_version() {
        unsafe {
            let catalog = take_string(moments_catalog_json());
            assert!(catalog.contains("box-breathing"));

            let version = CStr::from_ptr(moments_version()).to_str().unwrap();
            assert!(!version.is_empty());
        }
    }
}
