//! Owned backend frame
//!
//! Provides RAII-based memory management and read access to plane data for
//! both the decoded picture and the converted RGBA picture.

use super::status::FFmpegError;
use super::{CodecBackend, DecodeError, DecodeResult, Dimensions, PixelFormat, Plane};

/// Safe wrapper around a backend frame with RAII cleanup
///
/// The lifetime ties the frame to whatever produced it (the backend, or a
/// session borrowing the backend), so a frame cannot outlive its owner.
pub struct Frame<'a, B: CodecBackend> {
  backend: &'a B,
  handle: Option<B::Frame>,
}

impl<'a, B: CodecBackend> Frame<'a, B> {
  /// Allocate a new empty frame
  pub fn new(backend: &'a B) -> DecodeResult<Self> {
    let handle = backend
      .alloc_frame()
      .ok_or(DecodeError::AllocationFailed("AVFrame"))?;
    Ok(Self {
      backend,
      handle: Some(handle),
    })
  }

  /// Allocate a frame with buffers for the given format and dimensions
  pub fn new_video(backend: &'a B, dims: Dimensions, format: PixelFormat) -> DecodeResult<Self> {
    let mut frame = Self::new(backend)?;
    let ret = backend.frame_get_buffer(frame.handle_mut(), dims, format);
    if ret < 0 {
      return Err(DecodeError::ConversionFailed(format!(
        "cannot allocate {} {} frame buffer: {}",
        dims,
        backend.format_name(format),
        FFmpegError::from_code(ret)
      )));
    }
    Ok(frame)
  }

  /// Width and height the frame reports
  pub fn dimensions(&self) -> (u32, u32) {
    self.backend.frame_dimensions(self.handle())
  }

  /// Pixel format the frame reports
  pub fn format(&self) -> PixelFormat {
    self.backend.frame_format(self.handle())
  }

  /// Get `rows` rows of a plane
  ///
  /// Returns None if the plane doesn't exist or has no data
  pub fn plane(&self, plane: usize, rows: usize) -> Option<Plane<'_>> {
    self.backend.frame_plane(self.handle(), plane, rows)
  }

  pub(crate) fn handle(&self) -> &B::Frame {
    // Only `release` empties the slot, and it consumes `self`.
    self.handle.as_ref().unwrap_or_else(|| unreachable!("frame used after release"))
  }

  pub(crate) fn handle_mut(&mut self) -> &mut B::Frame {
    self.handle.as_mut().unwrap_or_else(|| unreachable!("frame used after release"))
  }

  /// Release the frame now instead of at end of scope
  pub fn release(mut self) {
    self.free();
  }

  fn free(&mut self) {
    if let Some(handle) = self.handle.take() {
      tracing::trace!(target: "prores", "releasing frame");
      self.backend.free_frame(handle);
    }
  }
}

impl<B: CodecBackend> Drop for Frame<'_, B> {
  fn drop(&mut self) {
    self.free();
  }
}

impl<B: CodecBackend> std::fmt::Debug for Frame<'_, B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let (width, height) = self.dimensions();
    f.debug_struct("Frame")
      .field("width", &width)
      .field("height", &height)
      .field("format", &self.format())
      .finish()
  }
}
