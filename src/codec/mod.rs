//! RAII wrappers around the codec library's decode resources
//!
//! Each wrapper owns exactly one backend handle and releases it on `Drop`,
//! so every resource is freed once, on every exit path.

pub mod backend;
pub mod context;
pub mod descriptor;
pub mod frame;
pub mod packet;
pub mod scaler;
pub mod status;

pub use backend::{CodecBackend, CodecId, Dimensions, PixelFormat, Plane};
pub use context::{DecodedFrame, DecoderSession};
pub use descriptor::{CodecDescriptor, DescriptorCell};
pub use frame::Frame;
pub use packet::PacketBuffer;
pub use scaler::{ConversionSession, ScaleAlgorithm, ScaleConfig};
pub use status::FFmpegError;

/// Decode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
  /// Number of decoder threads (0 for auto)
  pub thread_count: u32,
  /// Scaling algorithm used for the RGBA conversion
  pub scale_algorithm: ScaleAlgorithm,
  /// Trade speed for exact chroma interpolation and rounding
  pub accurate_rounding: bool,
}

impl Default for DecodeOptions {
  fn default() -> Self {
    Self {
      thread_count: 0,
      scale_algorithm: ScaleAlgorithm::Bilinear,
      accurate_rounding: false,
    }
  }
}

impl DecodeOptions {
  pub(crate) fn scale_config(&self) -> ScaleConfig {
    ScaleConfig {
      algorithm: self.scale_algorithm,
      accurate_rounding: self.accurate_rounding,
    }
  }
}

/// Failure category a caller can act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  /// The library could not allocate a context, packet or frame
  Allocation,
  /// A context or converter could not be set up for the codec/format
  Open,
  /// The submitted data produced no frame, or an inconsistent one
  Decode,
  /// Pixel-format conversion could not be performed
  Conversion,
  /// The output image buffer could not be allocated
  Extraction,
}

/// Decode pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
  #[error("Decoder not found for codec: {0:?}")]
  DecoderNotFound(CodecId),

  #[error("Failed to allocate {0}")]
  AllocationFailed(&'static str),

  #[error("Failed to open {what}: {source}")]
  OpenFailed {
    what: &'static str,
    #[source]
    source: FFmpegError,
  },

  #[error("Cannot create scaler from {src_format} to {dst_format} at {width}x{height}")]
  ScalerUnavailable {
    src_format: String,
    dst_format: String,
    width: u32,
    height: u32,
  },

  #[error("Invalid dimensions: {width}x{height}")]
  InvalidDimensions { width: u32, height: u32 },

  #[error("Decode failed: {0}")]
  DecodeFailed(FFmpegError),

  #[error("Decoder produced no frame: {0}")]
  NoFrame(FFmpegError),

  #[error("Decoded frame is {actual_width}x{actual_height}, expected {width}x{height}")]
  DimensionMismatch {
    width: u32,
    height: u32,
    actual_width: u32,
    actual_height: u32,
  },

  #[error("Conversion failed: {0}")]
  ConversionFailed(String),

  #[error("Failed to allocate output image of {0} bytes")]
  ExtractionFailed(usize),
}

impl DecodeError {
  /// Classify the error
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::AllocationFailed(_) => ErrorKind::Allocation,
      Self::DecoderNotFound(_)
      | Self::OpenFailed { .. }
      | Self::ScalerUnavailable { .. }
      | Self::InvalidDimensions { .. } => ErrorKind::Open,
      Self::DecodeFailed(_) | Self::NoFrame(_) | Self::DimensionMismatch { .. } => {
        ErrorKind::Decode
      }
      Self::ConversionFailed(_) => ErrorKind::Conversion,
      Self::ExtractionFailed(_) => ErrorKind::Extraction,
    }
  }

  /// Backend status code behind the error, if there is one
  pub fn status(&self) -> Option<std::os::raw::c_int> {
    match self {
      Self::OpenFailed { source, .. } => Some(source.code),
      Self::DecodeFailed(err) | Self::NoFrame(err) => Some(err.code),
      _ => None,
    }
  }
}

pub type DecodeResult<T> = Result<T, DecodeError>;
