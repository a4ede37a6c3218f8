//! FFI interface for C++ interop
//!
//! Provides C-compatible functions for reading flight payloads out of HTML.
//! All structured data crosses the boundary as JSON.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use serde::Serialize;

use crate::extract::{extract_all, ExtractionRequest};
use crate::payload::FlightPayload;

/// Result struct returned to C++
/// Both pointers are owned by Rust and must be freed via flight_free_result
#[repr(C)]
pub struct FlightResultFFI {
    /// JSON-serialized result (null-terminated)
    pub json_ptr: *mut c_char,
    /// Error message if extraction failed (null-terminated), or null on success
    pub error_ptr: *mut c_char,
}

/// Run an extraction request against the page's flight payload.
///
/// # Arguments
/// * `html_ptr` - Pointer to HTML content (UTF-8, not necessarily null-terminated)
/// * `html_len` - Length of HTML content in bytes
/// * `request_json` - JSON-serialized ExtractionRequest (null-terminated)
///
/// # Returns
/// FlightResultFFI with either json_ptr set (ExtractionResult JSON) or error_ptr set
///
/// # Safety
/// - `html_ptr` must point to valid memory of at least `html_len` bytes
/// - `request_json` must be a valid null-terminated C string
/// - Caller must free the result via `flight_free_result`
#[no_mangle]
pub unsafe extern "C" fn flight_extract(
    html_ptr: *const c_char,
    html_len: usize,
    request_json: *const c_char,
) -> FlightResultFFI {
    let html = match read_html(html_ptr, html_len) {
        Ok(html) => html,
        Err(msg) => return make_error_result(msg),
    };

    let request_str = match read_c_str(request_json, "Request JSON") {
        Ok(s) => s,
        Err(msg) => return make_error_result(&msg),
    };

    let request: ExtractionRequest = match serde_json::from_str(request_str) {
        Ok(r) => r,
        Err(e) => {
            return make_error_result(&format!("Failed to parse request JSON: {}", e));
        }
    };

    match extract_all(html, &request) {
        Ok(result) => make_json_result(&result),
        Err(e) => make_error_result(&e.to_string()),
    }
}

/// Materialize a single line key (convenience function)
///
/// # Safety
/// Same as flight_extract, with `key` a valid null-terminated C string
#[no_mangle]
pub unsafe extern "C" fn flight_object_by_key(
    html_ptr: *const c_char,
    html_len: usize,
    key: *const c_char,
) -> FlightResultFFI {
    let html = match read_html(html_ptr, html_len) {
        Ok(html) => html,
        Err(msg) => return make_error_result(msg),
    };

    let key = match read_c_str(key, "Key") {
        Ok(s) => s,
        Err(msg) => return make_error_result(&msg),
    };

    let object = FlightPayload::build(html, &[]).and_then(|payload| payload.object_by_key(key));
    match object {
        Ok(value) => make_json_result(&value),
        Err(e) => make_error_result(&e.to_string()),
    }
}

/// Free a FlightResultFFI returned by this module
///
/// # Safety
/// - `result` must have been returned by `flight_extract` or `flight_object_by_key`
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn flight_free_result(result: FlightResultFFI) {
    if !result.json_ptr.is_null() {
        drop(CString::from_raw(result.json_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

unsafe fn read_html<'a>(html_ptr: *const c_char, html_len: usize) -> Result<&'a str, &'static str> {
    if html_ptr.is_null() || html_len == 0 {
        return Ok("");
    }
    let slice = std::slice::from_raw_parts(html_ptr as *const u8, html_len);
    std::str::from_utf8(slice).map_err(|_| "Invalid UTF-8 in HTML content")
}

unsafe fn read_c_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("{} is null", what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| format!("Invalid UTF-8 in {}", what))
}

fn make_json_result<T: Serialize>(value: &T) -> FlightResultFFI {
    match serde_json::to_string(value) {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => FlightResultFFI {
                json_ptr: cstr.into_raw(),
                error_ptr: ptr::null_mut(),
            },
            Err(_) => make_error_result("Result JSON contains null bytes"),
        },
        Err(e) => make_error_result(&format!("Failed to serialize result: {}", e)),
    }
}

fn make_error_result(msg: &str) -> FlightResultFFI {
    let error = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    FlightResultFFI {
        json_ptr: ptr::null_mut(),
        error_ptr: error.into_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const PAGE: &str = r##"<script>self.__next_f.push([1,"0:{\"comic\":\"$1\"}\n1:{\"name\":\"Sample\"}\n"])</script>"##;

    unsafe fn take(result: FlightResultFFI) -> (Option<String>, Option<String>) {
        let json = (!result.json_ptr.is_null())
            .then(|| CStr::from_ptr(result.json_ptr).to_string_lossy().into_owned());
        let error = (!result.error_ptr.is_null())
            .then(|| CStr::from_ptr(result.error_ptr).to_string_lossy().into_owned());
        flight_free_result(result);
        (json, error)
    }

    #[test]
    fn test_flight_extract() {
        let request = CString::new(
            r#"{"specs":[{"lookup":"reference","name":"comic","alias":"name","path":["name"]}]}"#,
        )
        .unwrap();

        let (json, error) = unsafe {
            take(flight_extract(PAGE.as_ptr() as *const c_char, PAGE.len(), request.as_ptr()))
        };
        assert!(error.is_none());
        let value: Value = serde_json::from_str(&json.unwrap()).unwrap();
        assert_eq!(value["values"]["name"], "Sample");
    }

    #[test]
    fn test_flight_object_by_key() {
        let key = CString::new("0").unwrap();
        let (json, error) = unsafe {
            take(flight_object_by_key(PAGE.as_ptr() as *const c_char, PAGE.len(), key.as_ptr()))
        };
        assert!(error.is_none());
        let value: Value = serde_json::from_str(&json.unwrap()).unwrap();
        assert_eq!(value["comic"]["name"], "Sample");
    }

    #[test]
    fn test_errors_are_reported() {
        let key = CString::new("missing").unwrap();
        let (json, error) = unsafe {
            take(flight_object_by_key(PAGE.as_ptr() as *const c_char, PAGE.len(), key.as_ptr()))
        };
        assert!(json.is_none());
        assert!(error.unwrap().contains("missing"));

        let bad_request = CString::new("{not json").unwrap();
        let (_, error) = unsafe {
            take(flight_extract(PAGE.as_ptr() as *const c_char, PAGE.len(), bad_request.as_ptr()))
        };
        assert!(error.unwrap().starts_with("Failed to parse request JSON"));

        let (_, error) = unsafe { take(flight_extract(ptr::null(), 0, ptr::null())) };
        assert_eq!(error.as_deref(), Some("Request JSON is null"));

        let request = CString::new(r#"{"specs":[]}"#).unwrap();
        let (_, error) = unsafe { take(flight_extract(ptr::null(), 0, request.as_ptr())) };
        assert!(error.unwrap().contains("no script"));
    }
}
