//! FFmpeg implementation of [`CodecBackend`]
//!
//! Handles are thin `NonNull` wrappers; every `free_*` consumes its handle so
//! a pointer is handed back to FFmpeg exactly once.

use std::ffi::CStr;
use std::os::raw::c_int;
use std::ptr::NonNull;

use crate::codec::backend::{CodecBackend, CodecId, Dimensions, PixelFormat, Plane};
use crate::codec::scaler::{ScaleAlgorithm, ScaleConfig};
use crate::codec::status::AVERROR_EINVAL;
use crate::codec::{CodecDescriptor, DecodeOptions, DecodeResult, DescriptorCell};
use crate::ffi::{
  accessors::{
    ffcodec_get_name, ffctx_get_pix_fmt, ffctx_set_height, ffctx_set_thread_count,
    ffctx_set_thread_type, ffctx_set_width, ffframe_data, ffframe_data_const, ffframe_get_format,
    ffframe_get_height, ffframe_get_width, ffframe_linesize, ffframe_set_format,
    ffframe_set_height, ffframe_set_width, ffpkt_data_mut, ffpkt_size,
  },
  avcodec::{
    av_new_packet, av_packet_alloc, av_packet_free, avcodec_alloc_context3, avcodec_free_context,
    avcodec_open2, avcodec_receive_frame, avcodec_send_packet, find_checked_decoder,
  },
  avutil::{
    av_frame_alloc, av_frame_free, av_frame_get_buffer, av_log_set_level, log_level,
    pix_fmt_name, FRAME_ALIGN,
  },
  swscale::{
    is_input_supported, is_output_supported, sws_freeContext, sws_getContext, sws_scale,
    SWS_ACCURATE_RND, SWS_BICUBIC, SWS_BILINEAR, SWS_FAST_BILINEAR, SWS_FULL_CHR_H_INT, SWS_LANCZOS,
    SWS_POINT,
  },
  thread_type, AVCodec, AVCodecContext, AVFrame, AVPacket, SwsContext, AV_NUM_DATA_POINTERS,
};
use crate::image::RgbaImage;
use crate::pipeline::DecodePipeline;

// ============================================================================
// Handles
// ============================================================================

/// Registered codec implementation
///
/// FFmpeg's codec tables are static and never mutated, so the pointer can be
/// shared freely between threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodecRef(NonNull<AVCodec>);

unsafe impl Send for CodecRef {}
unsafe impl Sync for CodecRef {}

/// Owned AVCodecContext
pub struct ContextHandle(NonNull<AVCodecContext>);

/// Owned AVPacket
pub struct PacketHandle(NonNull<AVPacket>);

/// Owned AVFrame
pub struct FrameHandle(NonNull<AVFrame>);

/// Owned SwsContext
pub struct ScalerHandle(NonNull<SwsContext>);

// Each handle has a single owner and FFmpeg objects aren't tied to a thread.
unsafe impl Send for ContextHandle {}
unsafe impl Send for PacketHandle {}
unsafe impl Send for FrameHandle {}
unsafe impl Send for ScalerHandle {}

// ============================================================================
// Logging
// ============================================================================

/// FFmpeg's own log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
  Quiet,
  Panic,
  Fatal,
  #[default]
  Error,
  Warning,
  Info,
  Verbose,
  Debug,
  Trace,
}

impl LogLevel {
  fn as_raw(self) -> c_int {
    match self {
      Self::Quiet => log_level::QUIET,
      Self::Panic => log_level::PANIC,
      Self::Fatal => log_level::FATAL,
      Self::Error => log_level::ERROR,
      Self::Warning => log_level::WARNING,
      Self::Info => log_level::INFO,
      Self::Verbose => log_level::VERBOSE,
      Self::Debug => log_level::DEBUG,
      Self::Trace => log_level::TRACE,
    }
  }
}

// ============================================================================
// Backend
// ============================================================================

/// Codec backend linked against libavcodec, libavutil and libswscale
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
  pub fn new() -> Self {
    Self
  }

  /// Set FFmpeg's process-wide log level
  pub fn set_log_level(level: LogLevel) {
    unsafe { av_log_set_level(level.as_raw()) }
  }
}

fn sws_flags(config: ScaleConfig) -> c_int {
  let mut flags = match config.algorithm {
    ScaleAlgorithm::FastBilinear => SWS_FAST_BILINEAR,
    ScaleAlgorithm::Bilinear => SWS_BILINEAR,
    ScaleAlgorithm::Bicubic => SWS_BICUBIC,
    ScaleAlgorithm::Lanczos => SWS_LANCZOS,
    ScaleAlgorithm::Point => SWS_POINT,
  };
  if config.accurate_rounding {
    flags |= SWS_ACCURATE_RND | SWS_FULL_CHR_H_INT;
  }
  flags
}

impl CodecBackend for FfmpegBackend {
  type Codec = CodecRef;
  type Context = ContextHandle;
  type Packet = PacketHandle;
  type Frame = FrameHandle;
  type Scaler = ScalerHandle;

  fn find_decoder(&self, id: CodecId) -> Option<CodecRef> {
    let codec = find_checked_decoder(id.as_raw(), id.decoder_name());
    NonNull::new(codec as *mut AVCodec).map(CodecRef)
  }

  fn codec_name(&self, codec: CodecRef) -> String {
    let name = unsafe { ffcodec_get_name(codec.0.as_ptr()) };
    if name.is_null() {
      return String::from("unknown");
    }
    unsafe { CStr::from_ptr(name) }
      .to_string_lossy()
      .into_owned()
  }

  fn alloc_context(&self, codec: CodecRef) -> Option<ContextHandle> {
    NonNull::new(unsafe { avcodec_alloc_context3(codec.0.as_ptr()) }).map(ContextHandle)
  }

  fn set_thread_count(&self, ctx: &mut ContextHandle, count: u32) {
    let count = c_int::try_from(count).unwrap_or(c_int::MAX);
    unsafe {
      ffctx_set_thread_count(ctx.0.as_ptr(), count);
      // Frame threading would delay output by one packet per thread.
      ffctx_set_thread_type(ctx.0.as_ptr(), thread_type::SLICE);
    }
  }

  fn open_context(&self, ctx: &mut ContextHandle, codec: CodecRef) -> c_int {
    unsafe { avcodec_open2(ctx.0.as_ptr(), codec.0.as_ptr(), std::ptr::null_mut()) }
  }

  fn set_dimensions(&self, ctx: &mut ContextHandle, dims: Dimensions) {
    // Dimensions guarantees both sides fit in c_int.
    unsafe {
      ffctx_set_width(ctx.0.as_ptr(), dims.width() as c_int);
      ffctx_set_height(ctx.0.as_ptr(), dims.height() as c_int);
    }
  }

  fn context_format(&self, ctx: &ContextHandle) -> PixelFormat {
    PixelFormat::from_raw(unsafe { ffctx_get_pix_fmt(ctx.0.as_ptr()) })
  }

  fn free_context(&self, ctx: ContextHandle) {
    let mut ptr = ctx.0.as_ptr();
    unsafe { avcodec_free_context(&mut ptr) }
  }

  fn alloc_packet(&self) -> Option<PacketHandle> {
    NonNull::new(unsafe { av_packet_alloc() }).map(PacketHandle)
  }

  fn packet_copy_from(&self, pkt: &mut PacketHandle, data: &[u8]) -> c_int {
    let Ok(size) = c_int::try_from(data.len()) else {
      return AVERROR_EINVAL;
    };
    // av_new_packet also zeroes the input padding the decoder reads past the end.
    let ret = unsafe { av_new_packet(pkt.0.as_ptr(), size) };
    if ret < 0 || data.is_empty() {
      return ret;
    }
    unsafe {
      let dst = ffpkt_data_mut(pkt.0.as_ptr());
      if dst.is_null() {
        return AVERROR_EINVAL;
      }
      std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
    }
    0
  }

  fn packet_size(&self, pkt: &PacketHandle) -> usize {
    usize::try_from(unsafe { ffpkt_size(pkt.0.as_ptr()) }).unwrap_or(0)
  }

  fn free_packet(&self, pkt: PacketHandle) {
    let mut ptr = pkt.0.as_ptr();
    unsafe { av_packet_free(&mut ptr) }
  }

  fn send_packet(&self, ctx: &mut ContextHandle, pkt: Option<&PacketHandle>) -> c_int {
    let pkt_ptr = pkt.map_or(std::ptr::null(), |p| p.0.as_ptr() as *const AVPacket);
    unsafe { avcodec_send_packet(ctx.0.as_ptr(), pkt_ptr) }
  }

  fn receive_frame(&self, ctx: &mut ContextHandle, frame: &mut FrameHandle) -> c_int {
    unsafe { avcodec_receive_frame(ctx.0.as_ptr(), frame.0.as_ptr()) }
  }

  fn alloc_frame(&self) -> Option<FrameHandle> {
    NonNull::new(unsafe { av_frame_alloc() }).map(FrameHandle)
  }

  fn frame_get_buffer(
    &self,
    frame: &mut FrameHandle,
    dims: Dimensions,
    format: PixelFormat,
  ) -> c_int {
    unsafe {
      ffframe_set_width(frame.0.as_ptr(), dims.width() as c_int);
      ffframe_set_height(frame.0.as_ptr(), dims.height() as c_int);
      ffframe_set_format(frame.0.as_ptr(), format.as_raw());
      av_frame_get_buffer(frame.0.as_ptr(), FRAME_ALIGN)
    }
  }

  fn frame_dimensions(&self, frame: &FrameHandle) -> (u32, u32) {
    let (width, height) = unsafe {
      (
        ffframe_get_width(frame.0.as_ptr()),
        ffframe_get_height(frame.0.as_ptr()),
      )
    };
    (
      u32::try_from(width).unwrap_or(0),
      u32::try_from(height).unwrap_or(0),
    )
  }

  fn frame_format(&self, frame: &FrameHandle) -> PixelFormat {
    PixelFormat::from_raw(unsafe { ffframe_get_format(frame.0.as_ptr()) })
  }

  fn frame_plane<'a>(
    &self,
    frame: &'a FrameHandle,
    plane: usize,
    rows: usize,
  ) -> Option<Plane<'a>> {
    // Only the first plane's height is known without the format descriptor.
    if plane != 0 {
      return None;
    }
    let ptr = frame.0.as_ptr() as *const AVFrame;
    let data = unsafe { ffframe_data_const(ptr, 0) };
    if data.is_null() {
      return None;
    }
    // Negative linesizes (bottom-up images) are never produced here.
    let linesize = usize::try_from(unsafe { ffframe_linesize(ptr, 0) }).ok()?;
    let (_, height) = self.frame_dimensions(frame);
    let rows = rows.min(height as usize);
    if rows == 0 || linesize == 0 {
      return None;
    }
    let len = linesize.checked_mul(rows)?;
    // The plane holds `height` rows of `linesize` bytes and lives as long as
    // the frame handle it is borrowed from.
    let data = unsafe { std::slice::from_raw_parts(data, len) };
    Some(Plane { data, linesize })
  }

  fn free_frame(&self, frame: FrameHandle) {
    let mut ptr = frame.0.as_ptr();
    unsafe { av_frame_free(&mut ptr) }
  }

  fn create_scaler(
    &self,
    src_format: PixelFormat,
    dst_format: PixelFormat,
    dims: Dimensions,
    config: ScaleConfig,
  ) -> Option<ScalerHandle> {
    if !is_input_supported(src_format.as_raw()) || !is_output_supported(dst_format.as_raw()) {
      return None;
    }
    let width = dims.width() as c_int;
    let height = dims.height() as c_int;
    let ptr = unsafe {
      sws_getContext(
        width,
        height,
        src_format.as_raw(),
        width,
        height,
        dst_format.as_raw(),
        sws_flags(config),
        std::ptr::null_mut(),
        std::ptr::null_mut(),
        std::ptr::null(),
      )
    };
    NonNull::new(ptr).map(ScalerHandle)
  }

  fn scale(
    &self,
    scaler: &mut ScalerHandle,
    src: &FrameHandle,
    dst: &mut FrameHandle,
    rows: u32,
  ) -> c_int {
    let Ok(rows) = c_int::try_from(rows) else {
      return AVERROR_EINVAL;
    };

    let mut src_data = [std::ptr::null::<u8>(); AV_NUM_DATA_POINTERS];
    let mut src_linesize = [0 as c_int; AV_NUM_DATA_POINTERS];
    let mut dst_data = [std::ptr::null_mut::<u8>(); AV_NUM_DATA_POINTERS];
    let mut dst_linesize = [0 as c_int; AV_NUM_DATA_POINTERS];

    unsafe {
      for plane in 0..AV_NUM_DATA_POINTERS {
        let idx = plane as c_int;
        src_data[plane] = ffframe_data_const(src.0.as_ptr(), idx);
        src_linesize[plane] = ffframe_linesize(src.0.as_ptr(), idx);
        dst_data[plane] = ffframe_data(dst.0.as_ptr(), idx);
        dst_linesize[plane] = ffframe_linesize(dst.0.as_ptr(), idx);
      }

      sws_scale(
        scaler.0.as_ptr(),
        src_data.as_ptr(),
        src_linesize.as_ptr(),
        0,
        rows,
        dst_data.as_ptr(),
        dst_linesize.as_ptr(),
      )
    }
  }

  fn free_scaler(&self, scaler: ScalerHandle) {
    unsafe { sws_freeContext(scaler.0.as_ptr()) }
  }

  fn format_name(&self, format: PixelFormat) -> String {
    pix_fmt_name(format.as_raw()).unwrap_or_else(|| format!("pix_fmt({})", format.as_raw()))
  }
}

// ============================================================================
// Entry Points
// ============================================================================

static PRORES: DescriptorCell<CodecRef> = DescriptorCell::new(CodecId::ProRes);

/// The process-wide ProRes decoder, looked up on first use
pub fn prores_descriptor() -> DecodeResult<CodecDescriptor<CodecRef>> {
  PRORES.get_or_resolve(&FfmpegBackend)
}

/// Decode one ProRes frame of `width` x `height` into packed RGBA8
pub fn decode_prores(data: &[u8], width: u32, height: u32) -> DecodeResult<RgbaImage> {
  decode_prores_with_options(data, width, height, DecodeOptions::default())
}

/// [`decode_prores`] with explicit decoder and conversion settings
pub fn decode_prores_with_options(
  data: &[u8],
  width: u32,
  height: u32,
  options: DecodeOptions,
) -> DecodeResult<RgbaImage> {
  let backend = FfmpegBackend::new();
  let descriptor = prores_descriptor()?;
  DecodePipeline::new(&backend, descriptor)
    .with_options(options)
    .decode(data, width, height)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::codec::ErrorKind;
  use crate::ffi::accessors::{ffctx_set_pix_fmt, ffctx_set_time_base, ffframe_set_pts, ffpkt_data};
  use crate::ffi::avcodec::{avcodec_receive_packet, avcodec_send_frame, find_encoder_by_name};
  use crate::ffi::avutil::{av_log_get_level, pix_fmt_from_name};

  /// Encode one solid-colour 4:2:2 10-bit frame with FFmpeg's ProRes encoder
  fn encode_solid_prores(width: u32, height: u32, y: u16, cb: u16, cr: u16) -> Vec<u8> {
    let format = pix_fmt_from_name("yuv422p10le").expect("yuv422p10le pixel format");
    let codec = ["prores_ks", "prores"]
      .iter()
      .map(|name| find_encoder_by_name(name))
      .find(|codec| !codec.is_null())
      .expect("ProRes encoder");

    unsafe {
      let mut ctx = avcodec_alloc_context3(codec);
      assert!(!ctx.is_null());
      ffctx_set_width(ctx, width as c_int);
      ffctx_set_height(ctx, height as c_int);
      ffctx_set_pix_fmt(ctx, format);
      ffctx_set_time_base(ctx, 1, 25);
      assert_eq!(avcodec_open2(ctx, codec, std::ptr::null_mut()), 0);

      let mut frame = av_frame_alloc();
      assert!(!frame.is_null());
      ffframe_set_width(frame, width as c_int);
      ffframe_set_height(frame, height as c_int);
      ffframe_set_format(frame, format);
      ffframe_set_pts(frame, 0);
      assert_eq!(av_frame_get_buffer(frame, FRAME_ALIGN), 0);

      // Luma is full width, both chroma planes half width.
      for (plane, value, samples) in [
        (0, y, width as usize),
        (1, cb, width as usize / 2),
        (2, cr, width as usize / 2),
      ] {
        let base = ffframe_data(frame, plane);
        let linesize = ffframe_linesize(frame, plane) as usize;
        for row in 0..height as usize {
          let line = std::slice::from_raw_parts_mut(base.add(row * linesize), samples * 2);
          for sample in line.chunks_exact_mut(2) {
            sample.copy_from_slice(&value.to_le_bytes());
          }
        }
      }

      assert_eq!(avcodec_send_frame(ctx, frame), 0);
      assert_eq!(avcodec_send_frame(ctx, std::ptr::null()), 0);

      let mut pkt = av_packet_alloc();
      assert!(!pkt.is_null());
      assert_eq!(avcodec_receive_packet(ctx, pkt), 0);
      let size = ffpkt_size(pkt) as usize;
      let encoded = std::slice::from_raw_parts(ffpkt_data(pkt), size).to_vec();

      av_packet_free(&mut pkt);
      av_frame_free(&mut frame);
      avcodec_free_context(&mut ctx);
      encoded
    }
  }

  fn assert_gray(image: &RgbaImage, expected: u8) {
    for px in image.data().chunks_exact(4) {
      for channel in &px[..3] {
        assert!(
          channel.abs_diff(expected) <= 4,
          "pixel {:?} not within 4 of {}",
          px,
          expected
        );
      }
      assert_eq!(px[3], 255);
    }
  }

  #[test]
  fn test_prores_decoder_available() {
    let descriptor = prores_descriptor().unwrap();
    assert_eq!(descriptor.id(), CodecId::ProRes);
    assert_eq!(FfmpegBackend.codec_name(descriptor.codec()), "prores");
    assert_eq!(prores_descriptor().unwrap(), descriptor);
  }

  #[test]
  fn test_decode_solid_gray_frame() {
    let encoded = encode_solid_prores(64, 64, 504, 512, 512);
    let image = decode_prores(&encoded, 64, 64).unwrap();

    assert_eq!(image.width(), 64);
    assert_eq!(image.height(), 64);
    assert_eq!(image.data().len(), 64 * 64 * 4);
    assert_gray(&image, 128);
  }

  #[test]
  fn test_decode_with_options() {
    let encoded = encode_solid_prores(64, 32, 504, 512, 512);
    let options = DecodeOptions {
      thread_count: 2,
      scale_algorithm: ScaleAlgorithm::Lanczos,
      accurate_rounding: true,
    };
    let image = decode_prores_with_options(&encoded, 64, 32, options).unwrap();

    assert_eq!(image.data().len(), 64 * 32 * 4);
    assert_gray(&image, 128);
  }

  #[test]
  fn test_wrong_dimensions_are_decode_errors() {
    FfmpegBackend::set_log_level(LogLevel::Quiet);
    let encoded = encode_solid_prores(64, 64, 504, 512, 512);
    let err = decode_prores(&encoded, 32, 32).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
  }

  #[test]
  fn test_garbage_is_decode_error() {
    FfmpegBackend::set_log_level(LogLevel::Quiet);
    let garbage: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
    let err = decode_prores(&garbage, 64, 64).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    let err = decode_prores(&[], 64, 64).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
  }

  #[test]
  fn test_invalid_dimensions() {
    let err = decode_prores(&[0u8; 16], 0, 64).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Open);
  }

  #[test]
  fn test_enum_values_match_ffmpeg() {
    use crate::codec::backend::{AV_CODEC_ID_PRORES, AV_PIX_FMT_RGBA};
    use crate::ffi::avcodec::find_decoder;

    assert_eq!(pix_fmt_from_name("rgba"), Some(AV_PIX_FMT_RGBA));
    let codec = find_decoder(AV_CODEC_ID_PRORES);
    assert!(!codec.is_null());
    let name = unsafe { CStr::from_ptr(ffcodec_get_name(codec)) };
    assert_eq!(name.to_str().unwrap(), "prores");
  }

  #[test]
  fn test_format_names() {
    let backend = FfmpegBackend::new();
    assert_eq!(backend.format_name(PixelFormat::RGBA), "rgba");
    let format = pix_fmt_from_name("yuv422p10le").unwrap();
    assert_eq!(backend.format_name(PixelFormat::from_raw(format)), "yuv422p10le");
    assert_eq!(backend.format_name(PixelFormat::from_raw(100_000)), "pix_fmt(100000)");
  }

  #[test]
  fn test_set_log_level() {
    FfmpegBackend::set_log_level(LogLevel::Quiet);
    assert_eq!(unsafe { av_log_get_level() }, log_level::QUIET);
  }
}
