//! Pixel format conversion context
//!
//! Converts decoded frames from the decoder's native format to the output
//! format at a fixed size. Sizes never change, so no scaling happens; the
//! algorithm only affects chroma interpolation.

use super::status::FFmpegError;
use super::{CodecBackend, DecodeError, DecodeResult, Dimensions, Frame, PixelFormat};

/// Scaling algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleAlgorithm {
  /// Fast bilinear (fastest, lower quality)
  FastBilinear,
  /// Bilinear (good balance)
  #[default]
  Bilinear,
  /// Bicubic (higher quality, slower)
  Bicubic,
  /// Lanczos (highest quality, slowest)
  Lanczos,
  /// Point/nearest neighbor (fastest, blocky)
  Point,
}

impl ScaleAlgorithm {
  pub fn name(&self) -> &'static str {
    match self {
      Self::FastBilinear => "fast-bilinear",
      Self::Bilinear => "bilinear",
      Self::Bicubic => "bicubic",
      Self::Lanczos => "lanczos",
      Self::Point => "point",
    }
  }
}

/// Settings a conversion context is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScaleConfig {
  pub algorithm: ScaleAlgorithm,
  /// Full chroma interpolation and accurate rounding
  pub accurate_rounding: bool,
}

/// Safe wrapper around a scaler bound to (src format, dst format, size)
pub struct ConversionSession<'a, B: CodecBackend> {
  backend: &'a B,
  handle: Option<B::Scaler>,
  src_format: PixelFormat,
  dst_format: PixelFormat,
  dims: Dimensions,
}

impl<'a, B: CodecBackend> ConversionSession<'a, B> {
  /// Create a converter between two formats at a fixed size
  pub fn open(
    backend: &'a B,
    src_format: PixelFormat,
    dst_format: PixelFormat,
    dims: Dimensions,
    config: ScaleConfig,
  ) -> DecodeResult<Self> {
    let handle = backend
      .create_scaler(src_format, dst_format, dims, config)
      .ok_or_else(|| DecodeError::ScalerUnavailable {
        src_format: backend.format_name(src_format),
        dst_format: backend.format_name(dst_format),
        width: dims.width(),
        height: dims.height(),
      })?;

    tracing::debug!(
      target: "prores",
      src = %backend.format_name(src_format),
      dst = %backend.format_name(dst_format),
      algorithm = config.algorithm.name(),
      "created {} converter",
      dims
    );

    Ok(Self {
      backend,
      handle: Some(handle),
      src_format,
      dst_format,
      dims,
    })
  }

  /// Convert `src` into a newly allocated frame in the destination format
  ///
  /// The returned frame is owned by the caller; the converter never keeps it.
  pub fn convert<'s>(&'s mut self, src: &Frame<'_, B>) -> DecodeResult<Frame<'s, B>> {
    let backend = self.backend;
    let dims = self.dims;
    let dst_format = self.dst_format;

    let Some(scaler) = self.handle.as_mut() else {
      return Err(DecodeError::ConversionFailed("converter is closed".into()));
    };

    let (width, height) = src.dimensions();
    if !dims.matches(width, height) {
      return Err(DecodeError::ConversionFailed(format!(
        "source frame is {}x{}, converter expects {}",
        width, height, dims
      )));
    }

    let mut dst = Frame::new_video(backend, dims, dst_format).map_err(|err| match err {
      DecodeError::AllocationFailed(what) => {
        DecodeError::ConversionFailed(format!("cannot allocate destination {}", what))
      }
      err => err,
    })?;

    let ret = backend.scale(scaler, src.handle(), dst.handle_mut(), dims.height());
    if ret < 0 {
      return Err(DecodeError::ConversionFailed(format!(
        "scale failed: {}",
        FFmpegError::from_code(ret)
      )));
    }
    if ret as u32 != dims.height() {
      return Err(DecodeError::ConversionFailed(format!(
        "scaler produced {} of {} rows",
        ret,
        dims.height()
      )));
    }

    Ok(dst)
  }

  #[inline]
  pub fn src_format(&self) -> PixelFormat {
    self.src_format
  }

  #[inline]
  pub fn dst_format(&self) -> PixelFormat {
    self.dst_format
  }

  #[inline]
  pub fn dimensions(&self) -> Dimensions {
    self.dims
  }

  /// Free the converter; later calls do nothing
  pub fn close(&mut self) {
    if let Some(scaler) = self.handle.take() {
      tracing::trace!(target: "prores", "closing converter");
      self.backend.free_scaler(scaler);
    }
  }

  pub fn is_closed(&self) -> bool {
    self.handle.is_none()
  }
}

impl<B: CodecBackend> Drop for ConversionSession<'_, B> {
  fn drop(&mut self) {
    self.close();
  }
}

impl<B: CodecBackend> std::fmt::Debug for ConversionSession<'_, B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ConversionSession")
      .field("src_format", &self.src_format)
      .field("dst_format", &self.dst_format)
      .field("dims", &self.dims)
      .field("closed", &self.is_closed())
      .finish()
  }
}
