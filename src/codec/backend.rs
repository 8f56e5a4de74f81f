//! Contract between the decode path and the codec library
//!
//! The decode path never calls FFmpeg directly. It drives a [`CodecBackend`],
//! which hands out opaque handles (context, packet, frame, scaler) and reports
//! status with FFmpeg's negative `AVERROR` convention. The FFmpeg backend
//! implements it through the `ffi` module; tests use an instrumented fake.
//!
//! Handles are moved into the matching `free_*` call, so a handle can only be
//! released once.

use std::os::raw::c_int;

use super::scaler::ScaleConfig;
use super::{DecodeError, DecodeResult};

/// `AV_CODEC_ID_PRORES` from libavcodec's `enum AVCodecID`
pub const AV_CODEC_ID_PRORES: c_int = 147;

/// `AV_PIX_FMT_NONE` from libavutil's `enum AVPixelFormat`
pub const AV_PIX_FMT_NONE: c_int = -1;

/// `AV_PIX_FMT_RGBA` from libavutil's `enum AVPixelFormat`
pub const AV_PIX_FMT_RGBA: c_int = 26;

/// Codecs the decode path knows how to look up
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
  ProRes,
}

impl CodecId {
  /// Get the raw FFmpeg codec ID value
  pub fn as_raw(&self) -> c_int {
    match self {
      Self::ProRes => AV_CODEC_ID_PRORES,
    }
  }

  /// Decoder name understood by `avcodec_find_decoder_by_name`
  pub fn decoder_name(&self) -> &'static str {
    match self {
      Self::ProRes => "prores",
    }
  }
}

/// Raw pixel format value as reported by the codec library
///
/// The decoder's native format is passed through to the scaler untouched, so
/// only the formats this crate produces itself get names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelFormat(c_int);

impl PixelFormat {
  /// No format / unknown
  pub const NONE: Self = Self(AV_PIX_FMT_NONE);

  /// Packed RGBA, 8 bits per channel
  pub const RGBA: Self = Self(AV_PIX_FMT_RGBA);

  pub const fn from_raw(raw: c_int) -> Self {
    Self(raw)
  }

  /// Get the raw FFmpeg pixel format value
  pub const fn as_raw(&self) -> c_int {
    self.0
  }

  pub fn is_none(&self) -> bool {
    self.0 < 0
  }
}

/// Frame dimensions fixed for one decode invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
  width: u32,
  height: u32,
}

impl Dimensions {
  /// Bytes per RGBA8 pixel
  pub const RGBA_BYTES_PER_PIXEL: usize = 4;

  /// Validate dimensions for an RGBA8 decode.
  ///
  /// Both sides must be non-zero, fit the library's `int` fields and produce
  /// an image whose byte size fits in `usize`.
  pub fn new(width: u32, height: u32) -> DecodeResult<Self> {
    let invalid = || DecodeError::InvalidDimensions { width, height };

    if width == 0 || height == 0 {
      return Err(invalid());
    }
    if c_int::try_from(width).is_err() || c_int::try_from(height).is_err() {
      return Err(invalid());
    }
    (width as usize)
      .checked_mul(Self::RGBA_BYTES_PER_PIXEL)
      .and_then(|row| row.checked_mul(height as usize))
      .ok_or_else(invalid)?;

    Ok(Self { width, height })
  }

  #[inline]
  pub fn width(&self) -> u32 {
    self.width
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.height
  }

  /// Bytes in one tightly packed RGBA8 row
  #[inline]
  pub fn rgba_row_bytes(&self) -> usize {
    self.width as usize * Self::RGBA_BYTES_PER_PIXEL
  }

  /// Bytes in a tightly packed RGBA8 image
  #[inline]
  pub fn rgba_len(&self) -> usize {
    self.rgba_row_bytes() * self.height as usize
  }

  /// Whether a frame reporting `(width, height)` matches these dimensions
  #[inline]
  pub fn matches(&self, width: u32, height: u32) -> bool {
    self.width == width && self.height == height
  }
}

impl std::fmt::Display for Dimensions {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}x{}", self.width, self.height)
  }
}

/// Read-only view of one frame plane
#[derive(Clone, Copy, Debug)]
pub struct Plane<'a> {
  /// Plane bytes, at least `linesize * rows` long
  pub data: &'a [u8],
  /// Bytes between the starts of consecutive rows
  pub linesize: usize,
}

/// Operations the decode path needs from a codec/scaling library.
///
/// Every `alloc_*`/`create_*` that returns a handle is paired with a `free_*`
/// that consumes it. Status-returning calls follow FFmpeg: `>= 0` success,
/// `AVERROR_EAGAIN`/`AVERROR_EOF` for "no output", other negatives for errors.
pub trait CodecBackend {
  /// Codec descriptor; immutable and shareable across threads
  type Codec: Copy + Send + Sync + 'static;
  type Context;
  type Packet;
  type Frame;
  type Scaler;

  // ========================================================================
  // Codec Discovery
  // ========================================================================

  /// Find a decoder for the codec, or None if the library has none
  fn find_decoder(&self, id: CodecId) -> Option<Self::Codec>;

  /// Human-readable codec name
  fn codec_name(&self, codec: Self::Codec) -> String;

  // ========================================================================
  // Decoder Context
  // ========================================================================

  fn alloc_context(&self, codec: Self::Codec) -> Option<Self::Context>;

  /// Set the worker thread count (0 lets the library decide)
  fn set_thread_count(&self, ctx: &mut Self::Context, count: u32);

  fn open_context(&self, ctx: &mut Self::Context, codec: Self::Codec) -> c_int;

  fn set_dimensions(&self, ctx: &mut Self::Context, dims: Dimensions);

  /// Pixel format the context discovered while decoding
  fn context_format(&self, ctx: &Self::Context) -> PixelFormat;

  fn free_context(&self, ctx: Self::Context);

  // ========================================================================
  // Packets
  // ========================================================================

  fn alloc_packet(&self) -> Option<Self::Packet>;

  /// Allocate packet storage owned by the library and copy `data` into it
  fn packet_copy_from(&self, pkt: &mut Self::Packet, data: &[u8]) -> c_int;

  fn packet_size(&self, pkt: &Self::Packet) -> usize;

  fn free_packet(&self, pkt: Self::Packet);

  // ========================================================================
  // Decoding
  // ========================================================================

  /// Submit a packet, or None to flush the decoder
  fn send_packet(&self, ctx: &mut Self::Context, pkt: Option<&Self::Packet>) -> c_int;

  fn receive_frame(&self, ctx: &mut Self::Context, frame: &mut Self::Frame) -> c_int;

  // ========================================================================
  // Frames
  // ========================================================================

  fn alloc_frame(&self) -> Option<Self::Frame>;

  /// Allocate plane buffers for the given dimensions and format
  fn frame_get_buffer(
    &self,
    frame: &mut Self::Frame,
    dims: Dimensions,
    format: PixelFormat,
  ) -> c_int;

  /// Width and height the frame reports
  fn frame_dimensions(&self, frame: &Self::Frame) -> (u32, u32);

  fn frame_format(&self, frame: &Self::Frame) -> PixelFormat;

  /// View `rows` rows of a plane, or None if the plane is absent
  fn frame_plane<'a>(&self, frame: &'a Self::Frame, plane: usize, rows: usize)
  -> Option<Plane<'a>>;

  fn free_frame(&self, frame: Self::Frame);

  // ========================================================================
  // Scaling
  // ========================================================================

  fn create_scaler(
    &self,
    src_format: PixelFormat,
    dst_format: PixelFormat,
    dims: Dimensions,
    config: ScaleConfig,
  ) -> Option<Self::Scaler>;

  /// Convert `src` into `dst`, returning the number of output rows or an error
  fn scale(
    &self,
    scaler: &mut Self::Scaler,
    src: &Self::Frame,
    dst: &mut Self::Frame,
    rows: u32,
  ) -> c_int;

  fn free_scaler(&self, scaler: Self::Scaler);

  // ========================================================================
  // Diagnostics
  // ========================================================================

  /// Name of a pixel format for log output
  fn format_name(&self, format: PixelFormat) -> String {
    format!("pix_fmt({})", format.as_raw())
  }
}
