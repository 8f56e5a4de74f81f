//! DOMException-style errors for the JavaScript API
//!
//! Decode failures surface in JavaScript as errors whose message starts with a
//! DOMException name, so callers can branch on the failure category:
//! - `TypeError` - width/height rejected before decoding
//! - `NotSupportedError` - no ProRes decoder, or no converter for the format
//! - `DataError` - the bytes are not a valid ProRes frame
//! - `EncodingError` - decoding or conversion failed otherwise
//! - `QuotaExceededError` - memory for a frame or the output image ran out

use napi::bindgen_prelude::*;

use crate::codec::{DecodeError, ErrorKind};

/// DOMException error names used by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DOMExceptionName {
  /// Decoding or conversion failed
  EncodingError,
  /// Decoder or converter not available
  NotSupportedError,
  /// Invalid data format
  DataError,
  /// Allocation failed
  QuotaExceededError,
  /// Invalid argument
  TypeError,
}

impl DOMExceptionName {
  pub fn as_str(&self) -> &'static str {
    match self {
      DOMExceptionName::EncodingError => "EncodingError",
      DOMExceptionName::NotSupportedError => "NotSupportedError",
      DOMExceptionName::DataError => "DataError",
      DOMExceptionName::QuotaExceededError => "QuotaExceededError",
      DOMExceptionName::TypeError => "TypeError",
    }
  }

  /// Category a decode failure is reported under
  pub fn for_decode_error(err: &DecodeError) -> Self {
    match err {
      DecodeError::InvalidDimensions { .. } => DOMExceptionName::TypeError,
      DecodeError::DecodeFailed(status) if status.is_invalid_data() => DOMExceptionName::DataError,
      DecodeError::DecodeFailed(status) if status.is_oom() => DOMExceptionName::QuotaExceededError,
      _ => match err.kind() {
        ErrorKind::Allocation | ErrorKind::Extraction => DOMExceptionName::QuotaExceededError,
        ErrorKind::Open => DOMExceptionName::NotSupportedError,
        ErrorKind::Decode | ErrorKind::Conversion => DOMExceptionName::EncodingError,
      },
    }
  }
}

/// Create an error with DOMException-style naming
///
/// # Example
/// ```ignore
/// return Err(dom_exception(DOMExceptionName::TypeError, "width must be positive"));
/// ```
pub fn dom_exception(name: DOMExceptionName, message: &str) -> Error {
  let status = match name {
    DOMExceptionName::TypeError => Status::InvalidArg,
    _ => Status::GenericFailure,
  };
  Error::new(status, format!("{}: {}", name.as_str(), message))
}

/// Convert a decode failure into the error thrown to JavaScript
pub fn decode_error(err: &DecodeError) -> Error {
  dom_exception(DOMExceptionName::for_decode_error(err), &err.to_string())
}
