//! Backend status codes
//!
//! Backends report status the way FFmpeg does: zero or positive on success,
//! a negative `AVERROR` code otherwise. This module holds the codes the
//! decode path inspects and the error type carrying them.

use std::fmt;
use std::os::raw::c_int;

// ============================================================================
// Error Codes
// ============================================================================

/// End of file / stream reached
pub const AVERROR_EOF: c_int = fferrtag(b'E', b'O', b'F', b' ');

/// Internal bug (should never happen)
pub const AVERROR_BUG: c_int = fferrtag(b'B', b'U', b'G', b'!');

/// Decoder not found
pub const AVERROR_DECODER_NOT_FOUND: c_int = fferrtag(0xF8, b'D', b'E', b'C');

/// Invalid data found when processing input
pub const AVERROR_INVALIDDATA: c_int = fferrtag(b'I', b'N', b'D', b'A');

/// Unknown error
pub const AVERROR_UNKNOWN: c_int = fferrtag(b'U', b'N', b'K', b'N');

/// Resource temporarily unavailable (try again)
/// Linux: EAGAIN = 11, macOS: EAGAIN = 35
#[cfg(target_os = "macos")]
pub const AVERROR_EAGAIN: c_int = -35;

#[cfg(not(target_os = "macos"))]
pub const AVERROR_EAGAIN: c_int = -11;

/// Out of memory
pub const AVERROR_ENOMEM: c_int = -12;

/// Invalid argument
pub const AVERROR_EINVAL: c_int = -22;

/// Create FFmpeg error tag from 4 bytes
const fn fferrtag(a: u8, b: u8, c: u8, d: u8) -> c_int {
  -((a as c_int) | ((b as c_int) << 8) | ((c as c_int) << 16) | ((d as c_int) << 24))
}

// ============================================================================
// Error Type
// ============================================================================

/// Backend error with status code and message
#[derive(Clone, PartialEq, Eq)]
pub struct FFmpegError {
  /// Error code (negative)
  pub code: c_int,
  /// Human-readable message
  pub message: String,
}

impl FFmpegError {
  /// Create error from a status code, describing it with the linked FFmpeg
  /// when available.
  pub fn from_code(code: c_int) -> Self {
    Self {
      code,
      message: describe(code),
    }
  }

  /// Create error with custom message
  pub fn new(code: c_int, message: impl Into<String>) -> Self {
    Self {
      code,
      message: message.into(),
    }
  }

  /// Check if this is EAGAIN (no output available yet)
  #[inline]
  pub fn is_eagain(&self) -> bool {
    self.code == AVERROR_EAGAIN
  }

  /// Check if this is EOF
  #[inline]
  pub fn is_eof(&self) -> bool {
    self.code == AVERROR_EOF
  }

  /// Check if this error means "no output" rather than a hard failure
  #[inline]
  pub fn is_no_output(&self) -> bool {
    self.is_eagain() || self.is_eof()
  }

  /// Check if this is an out of memory error
  #[inline]
  pub fn is_oom(&self) -> bool {
    self.code == AVERROR_ENOMEM
  }

  /// Check if the input data was rejected as invalid
  #[inline]
  pub fn is_invalid_data(&self) -> bool {
    self.code == AVERROR_INVALIDDATA
  }
}

impl fmt::Debug for FFmpegError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FFmpegError")
      .field("code", &self.code)
      .field("message", &self.message)
      .finish()
  }
}

impl fmt::Display for FFmpegError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "FFmpeg error {}: {}", self.code, self.message)
  }
}

impl std::error::Error for FFmpegError {}

/// Result type for backend status checks
pub type FFmpegResult<T> = Result<T, FFmpegError>;

// ============================================================================
// Error Checking
// ============================================================================

/// Check a status code and convert to Result
///
/// Returns Ok with the value if >= 0, Err with FFmpegError if < 0
#[inline]
pub fn check_error(ret: c_int) -> FFmpegResult<c_int> {
  if ret < 0 {
    Err(FFmpegError::from_code(ret))
  } else {
    Ok(ret)
  }
}

/// Check a status code, treating EAGAIN and EOF as "no output"
///
/// Returns Ok(Some(value)) if >= 0, Ok(None) if EAGAIN/EOF, Err otherwise
#[inline]
pub fn check_error_except_eagain_eof(ret: c_int) -> FFmpegResult<Option<c_int>> {
  if ret >= 0 {
    Ok(Some(ret))
  } else if ret == AVERROR_EAGAIN || ret == AVERROR_EOF {
    Ok(None)
  } else {
    Err(FFmpegError::from_code(ret))
  }
}

#[cfg(feature = "ffmpeg")]
fn describe(code: c_int) -> String {
  let mut buf = [0 as std::os::raw::c_char; 256];
  unsafe {
    crate::ffi::avutil::av_strerror(code, buf.as_mut_ptr(), buf.len());
    std::ffi::CStr::from_ptr(buf.as_ptr())
      .to_string_lossy()
      .into_owned()
  }
}

#[cfg(not(feature = "ffmpeg"))]
fn describe(code: c_int) -> String {
  match code {
    AVERROR_EOF => "End of file".into(),
    AVERROR_EAGAIN => "Resource temporarily unavailable".into(),
    AVERROR_INVALIDDATA => "Invalid data found when processing input".into(),
    AVERROR_ENOMEM => "Cannot allocate memory".into(),
    AVERROR_EINVAL => "Invalid argument".into(),
    AVERROR_DECODER_NOT_FOUND => "Decoder not found".into(),
    AVERROR_BUG => "Internal bug, should not have happened".into(),
    AVERROR_UNKNOWN => "Unknown error occurred".into(),
    _ => format!("Error number {} occurred", code),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_codes() {
    assert!(AVERROR_EOF < 0);
    assert!(AVERROR_EAGAIN < 0);
    assert!(AVERROR_INVALIDDATA < 0);
    assert_ne!(AVERROR_EOF, AVERROR_INVALIDDATA);
  }

  #[test]
  fn test_check_error() {
    assert!(check_error(0).is_ok());
    assert!(check_error(100).is_ok());
    assert!(check_error(-1).is_err());
    assert!(check_error(AVERROR_EAGAIN).is_err());
  }

  #[test]
  fn test_check_error_except_eagain_eof() {
    assert_eq!(check_error_except_eagain_eof(0).unwrap(), Some(0));
    assert_eq!(check_error_except_eagain_eof(AVERROR_EAGAIN).unwrap(), None);
    assert_eq!(check_error_except_eagain_eof(AVERROR_EOF).unwrap(), None);
    assert!(check_error_except_eagain_eof(AVERROR_INVALIDDATA).is_err());
  }

  #[test]
  fn test_no_output_classification() {
    assert!(FFmpegError::from_code(AVERROR_EAGAIN).is_no_output());
    assert!(FFmpegError::from_code(AVERROR_EOF).is_no_output());
    let invalid = FFmpegError::from_code(AVERROR_INVALIDDATA);
    assert!(!invalid.is_no_output());
    assert!(invalid.is_invalid_data());
    assert!(!invalid.message.is_empty());
  }
}
