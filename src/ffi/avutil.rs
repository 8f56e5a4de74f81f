//! libavutil function declarations
//!
//! Provides frame allocation, error strings, pixel format names and logging control.

use super::types::*;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};

unsafe extern "C" {
    // ========================================================================
    // Frame Management
    // ========================================================================

    /// Allocate an AVFrame and set its fields to default values
    pub fn av_frame_alloc() -> *mut AVFrame;

    /// Free the frame and any dynamically allocated objects in it
    pub fn av_frame_free(frame: *mut *mut AVFrame);

    /// Allocate new buffers for video data based on frame format/dimensions
    ///
    /// # Arguments
    /// * `frame` - Frame with format, width, height set
    /// * `align` - Buffer size alignment (0 for default, 32 recommended for SIMD)
    pub fn av_frame_get_buffer(frame: *mut AVFrame, align: c_int) -> c_int;

    // ========================================================================
    // Pixel Formats
    // ========================================================================

    /// Short name of a pixel format, or NULL if unknown
    pub fn av_get_pix_fmt_name(pix_fmt: c_int) -> *const c_char;

    /// Pixel format value for a name (e.g., "yuv422p10le"), or -1 (AV_PIX_FMT_NONE)
    pub fn av_get_pix_fmt(name: *const c_char) -> c_int;

    // ========================================================================
    // Error Handling
    // ========================================================================

    /// Put a description of the AVERROR code errnum in errbuf
    ///
    /// # Arguments
    /// * `errnum` - Error code to describe
    /// * `errbuf` - Buffer to put description in
    /// * `errbuf_size` - Size of errbuf
    ///
    /// # Returns
    /// 0 on success, negative if truncated
    pub fn av_strerror(errnum: c_int, errbuf: *mut c_char, errbuf_size: usize) -> c_int;

    // ========================================================================
    // Logging
    // ========================================================================

    /// Set the logging level
    pub fn av_log_set_level(level: c_int);

    /// Get the current logging level
    pub fn av_log_get_level() -> c_int;
}

// ============================================================================
// Logging Levels
// ============================================================================

pub mod log_level {
    use std::os::raw::c_int;

    pub const QUIET: c_int = -8;
    pub const PANIC: c_int = 0;
    pub const FATAL: c_int = 8;
    pub const ERROR: c_int = 16;
    pub const WARNING: c_int = 24;
    pub const INFO: c_int = 32;
    pub const VERBOSE: c_int = 40;
    pub const DEBUG: c_int = 48;
    pub const TRACE: c_int = 56;
}

/// Buffer alignment for frame data, suitable for SIMD
pub const FRAME_ALIGN: c_int = 32;

// ============================================================================
// Helper Functions
// ============================================================================

/// Name of a pixel format, if FFmpeg knows it
pub fn pix_fmt_name(format: c_int) -> Option<String> {
    let name = unsafe { av_get_pix_fmt_name(format) };
    if name.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
}

/// Look a pixel format up by name
pub fn pix_fmt_from_name(name: &str) -> Option<c_int> {
    let c_name = CString::new(name).ok()?;
    let format = unsafe { av_get_pix_fmt(c_name.as_ptr()) };
    (format >= 0).then_some(format)
}
