//! libavcodec function declarations
//!
//! Decoding for the ProRes path, plus the few encoding entry points the
//! end-to-end tests use to produce fixtures.

use super::accessors::ffcodec_get_name;
use super::types::*;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};

unsafe extern "C" {
  // ========================================================================
  // Codec Discovery
  // ========================================================================

  /// Find a decoder by codec ID
  pub fn avcodec_find_decoder(id: c_int) -> *const AVCodec;

  /// Find a decoder by name
  pub fn avcodec_find_decoder_by_name(name: *const c_char) -> *const AVCodec;

  /// Find an encoder by name (e.g., "prores_ks")
  pub fn avcodec_find_encoder_by_name(name: *const c_char) -> *const AVCodec;

  /// Non-zero if the codec is a decoder
  pub fn av_codec_is_decoder(codec: *const AVCodec) -> c_int;

  // ========================================================================
  // Codec Context Lifecycle
  // ========================================================================

  /// Allocate an AVCodecContext and set its fields to default values
  pub fn avcodec_alloc_context3(codec: *const AVCodec) -> *mut AVCodecContext;

  /// Free the codec context and everything associated with it
  pub fn avcodec_free_context(avctx: *mut *mut AVCodecContext);

  /// Initialize the AVCodecContext to use the given AVCodec
  pub fn avcodec_open2(
    avctx: *mut AVCodecContext,
    codec: *const AVCodec,
    options: *mut *mut AVDictionary,
  ) -> c_int;

  // ========================================================================
  // Decoding (send packet, receive frame)
  // ========================================================================

  /// Supply raw packet data to the decoder
  ///
  /// # Arguments
  /// * `avctx` - Codec context
  /// * `avpkt` - AVPacket containing compressed data, or NULL to flush
  ///
  /// # Returns
  /// * 0 on success
  /// * AVERROR(EAGAIN) - output not available, must read with receive_frame first
  /// * AVERROR_EOF - decoder has been flushed
  /// * AVERROR(EINVAL) - codec not opened
  /// * AVERROR(ENOMEM) - failed to add packet to queue
  pub fn avcodec_send_packet(avctx: *mut AVCodecContext, avpkt: *const AVPacket) -> c_int;

  /// Return decoded output data from the decoder
  ///
  /// # Returns
  /// * 0 on success
  /// * AVERROR(EAGAIN) - output not available, must send more input
  /// * AVERROR_EOF - decoder has been fully flushed
  /// * AVERROR(EINVAL) - codec not opened
  pub fn avcodec_receive_frame(avctx: *mut AVCodecContext, frame: *mut AVFrame) -> c_int;

  // ========================================================================
  // Encoding (send frame, receive packet)
  // ========================================================================

  /// Supply a raw video frame to the encoder, or NULL to flush
  pub fn avcodec_send_frame(avctx: *mut AVCodecContext, frame: *const AVFrame) -> c_int;

  /// Read encoded data from the encoder
  pub fn avcodec_receive_packet(avctx: *mut AVCodecContext, avpkt: *mut AVPacket) -> c_int;

  // ========================================================================
  // Packet Management
  // ========================================================================

  /// Allocate an AVPacket and set its fields to default values
  pub fn av_packet_alloc() -> *mut AVPacket;

  /// Free the packet, if the packet is reference counted, it will be unreferenced first
  pub fn av_packet_free(pkt: *mut *mut AVPacket);

  /// Allocate the payload of a packet and zero its padding
  pub fn av_new_packet(pkt: *mut AVPacket, size: c_int) -> c_int;
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Find decoder by raw codec ID
pub fn find_decoder(codec_id: c_int) -> *const AVCodec {
  unsafe { avcodec_find_decoder(codec_id) }
}

/// Find decoder by name (null if the name contains a NUL byte)
pub fn find_decoder_by_name(name: &str) -> *const AVCodec {
  match CString::new(name) {
    Ok(c_name) => unsafe { avcodec_find_decoder_by_name(c_name.as_ptr()) },
    Err(_) => std::ptr::null(),
  }
}

/// Find encoder by name (null if the name contains a NUL byte)
pub fn find_encoder_by_name(name: &str) -> *const AVCodec {
  match CString::new(name) {
    Ok(c_name) => unsafe { avcodec_find_encoder_by_name(c_name.as_ptr()) },
    Err(_) => std::ptr::null(),
  }
}

/// Find a decoder, checking the result really is the named decoder
///
/// Tries the codec ID first and the decoder name second.
pub fn find_checked_decoder(codec_id: c_int, name: &str) -> *const AVCodec {
  let is_decoder = |codec: *const AVCodec| {
    if codec.is_null() || unsafe { av_codec_is_decoder(codec) } == 0 {
      return false;
    }
    let found = unsafe { ffcodec_get_name(codec) };
    !found.is_null() && unsafe { CStr::from_ptr(found) }.to_bytes() == name.as_bytes()
  };

  let codec = find_decoder(codec_id);
  if is_decoder(codec) {
    return codec;
  }
  let codec = find_decoder_by_name(name);
  if is_decoder(codec) {
    return codec;
  }
  std::ptr::null()
}
