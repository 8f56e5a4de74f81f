//! Rust declarations for C accessor functions
//!
//! These functions provide access to FFmpeg struct fields via the thin C accessor library.

use super::types::*;
use std::os::raw::c_int;

unsafe extern "C" {
  // ========================================================================
  // AVCodecContext Setters
  // ========================================================================

  pub fn ffctx_set_width(ctx: *mut AVCodecContext, width: c_int);
  pub fn ffctx_set_height(ctx: *mut AVCodecContext, height: c_int);
  pub fn ffctx_set_pix_fmt(ctx: *mut AVCodecContext, pix_fmt: c_int);
  pub fn ffctx_set_time_base(ctx: *mut AVCodecContext, num: c_int, den: c_int);
  pub fn ffctx_set_thread_count(ctx: *mut AVCodecContext, thread_count: c_int);
  pub fn ffctx_set_thread_type(ctx: *mut AVCodecContext, thread_type: c_int);

  // ========================================================================
  // AVCodecContext Getters
  // ========================================================================

  pub fn ffctx_get_pix_fmt(ctx: *const AVCodecContext) -> c_int;

  // ========================================================================
  // AVCodec Getters
  // ========================================================================

  pub fn ffcodec_get_name(codec: *const AVCodec) -> *const std::os::raw::c_char;

  // ========================================================================
  // AVFrame Setters
  // ========================================================================

  pub fn ffframe_set_width(frame: *mut AVFrame, width: c_int);
  pub fn ffframe_set_height(frame: *mut AVFrame, height: c_int);
  pub fn ffframe_set_format(frame: *mut AVFrame, format: c_int);
  pub fn ffframe_set_pts(frame: *mut AVFrame, pts: i64);

  // ========================================================================
  // AVFrame Getters
  // ========================================================================

  pub fn ffframe_get_width(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_height(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_format(frame: *const AVFrame) -> c_int;

  // ========================================================================
  // AVFrame Data Access
  // ========================================================================

  pub fn ffframe_data(frame: *mut AVFrame, plane: c_int) -> *mut u8;
  pub fn ffframe_data_const(frame: *const AVFrame, plane: c_int) -> *const u8;
  pub fn ffframe_linesize(frame: *const AVFrame, plane: c_int) -> c_int;

  // ========================================================================
  // AVPacket Access
  // ========================================================================

  pub fn ffpkt_data(pkt: *const AVPacket) -> *const u8;
  pub fn ffpkt_data_mut(pkt: *mut AVPacket) -> *mut u8;
  pub fn ffpkt_size(pkt: *const AVPacket) -> c_int;
}
