//! Decoder context bound to one codec
//!
//! Provides single-frame decoding with RAII cleanup.

use super::status::{check_error, check_error_except_eagain_eof, FFmpegError, AVERROR_EINVAL};
use super::{
  CodecBackend, CodecDescriptor, DecodeError, DecodeOptions, DecodeResult, Dimensions, Frame,
  PacketBuffer, PixelFormat,
};

/// Safe wrapper around a decoder context
///
/// Frames returned by [`DecoderSession::decode_one`] borrow the session, so
/// the session cannot be closed while one of its frames is still in use.
pub struct DecoderSession<'a, B: CodecBackend> {
  backend: &'a B,
  descriptor: CodecDescriptor<B::Codec>,
  handle: Option<B::Context>,
}

impl<'a, B: CodecBackend> DecoderSession<'a, B> {
  /// Allocate and open a decoder context for the descriptor's codec
  pub fn open(
    backend: &'a B,
    descriptor: &CodecDescriptor<B::Codec>,
    options: &DecodeOptions,
  ) -> DecodeResult<Self> {
    let handle = backend
      .alloc_context(descriptor.codec())
      .ok_or(DecodeError::AllocationFailed("AVCodecContext"))?;
    tracing::debug!(target: "prores", "allocated decoder context");

    // Wrap first so a failed open still frees the context.
    let mut session = Self {
      backend,
      descriptor: *descriptor,
      handle: Some(handle),
    };

    if let Some(ctx) = session.handle.as_mut() {
      backend.set_thread_count(ctx, options.thread_count);
      check_error(backend.open_context(ctx, descriptor.codec())).map_err(|source| {
        DecodeError::OpenFailed {
          what: "decoder context",
          source,
        }
      })?;
    }

    Ok(session)
  }

  /// Decode exactly one frame from `packet`
  ///
  /// If the decoder holds the frame back after the packet, it is flushed once
  /// before giving up. The returned frame must match `dims`.
  pub fn decode_one<'s>(
    &'s mut self,
    packet: &PacketBuffer<'_, B>,
    dims: Dimensions,
  ) -> DecodeResult<DecodedFrame<'s, B>> {
    let backend = self.backend;
    let Some(ctx) = self.handle.as_mut() else {
      return Err(DecodeError::DecodeFailed(FFmpegError::new(
        AVERROR_EINVAL,
        "decoder session is closed",
      )));
    };
    let Some(pkt) = packet.handle() else {
      return Err(DecodeError::DecodeFailed(FFmpegError::new(
        AVERROR_EINVAL,
        "packet already released",
      )));
    };

    backend.set_dimensions(ctx, dims);
    let mut frame = Frame::new(backend)?;

    // A full input queue is not an error; receive_frame drains it.
    check_error_except_eagain_eof(backend.send_packet(ctx, Some(pkt)))
      .map_err(DecodeError::DecodeFailed)?;

    let mut ret = backend.receive_frame(ctx, frame.handle_mut());
    if FFmpegError::from_code(ret).is_eagain() {
      tracing::debug!(target: "prores", "no frame after packet, draining decoder");
      check_error_except_eagain_eof(backend.send_packet(ctx, None))
        .map_err(DecodeError::DecodeFailed)?;
      ret = backend.receive_frame(ctx, frame.handle_mut());
    }

    if ret < 0 {
      let err = FFmpegError::from_code(ret);
      return Err(if err.is_no_output() {
        DecodeError::NoFrame(err)
      } else {
        DecodeError::DecodeFailed(err)
      });
    }

    let (width, height) = frame.dimensions();
    if !dims.matches(width, height) {
      return Err(DecodeError::DimensionMismatch {
        width: dims.width(),
        height: dims.height(),
        actual_width: width,
        actual_height: height,
      });
    }

    let format = self.source_format(&frame);
    tracing::debug!(
      target: "prores",
      width,
      height,
      format = %backend.format_name(format),
      "decoded frame"
    );

    Ok(DecodedFrame { frame, format })
  }

  /// Falls back to the format the context discovered when the frame itself
  /// reports none.
  fn source_format(&self, frame: &Frame<'_, B>) -> PixelFormat {
    let format = frame.format();
    if !format.is_none() {
      return format;
    }
    self
      .handle
      .as_ref()
      .map(|ctx| self.backend.context_format(ctx))
      .unwrap_or(PixelFormat::NONE)
  }

  #[inline]
  pub fn descriptor(&self) -> &CodecDescriptor<B::Codec> {
    &self.descriptor
  }

  /// Free the decoder context; later calls do nothing
  pub fn close(&mut self) {
    if let Some(ctx) = self.handle.take() {
      tracing::trace!(target: "prores", "closing decoder context");
      self.backend.free_context(ctx);
    }
  }

  pub fn is_closed(&self) -> bool {
    self.handle.is_none()
  }
}

/// Frame produced by [`DecoderSession::decode_one`]
///
/// Derefs to the underlying [`Frame`].
pub struct DecodedFrame<'a, B: CodecBackend> {
  frame: Frame<'a, B>,
  format: PixelFormat,
}

impl<'a, B: CodecBackend> DecodedFrame<'a, B> {
  /// Native pixel format of the picture
  #[inline]
  pub fn source_format(&self) -> PixelFormat {
    self.format
  }

  #[inline]
  pub fn frame(&self) -> &Frame<'a, B> {
    &self.frame
  }
}

impl<'a, B: CodecBackend> std::ops::Deref for DecodedFrame<'a, B> {
  type Target = Frame<'a, B>;

  fn deref(&self) -> &Self::Target {
    &self.frame
  }
}

impl<B: CodecBackend> std::fmt::Debug for DecodedFrame<'_, B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DecodedFrame")
      .field("format", &self.format)
      .field("frame", &self.frame)
      .finish()
  }
}

impl<B: CodecBackend> Drop for DecoderSession<'_, B> {
  fn drop(&mut self) {
    self.close();
  }
}

impl<B: CodecBackend> std::fmt::Debug for DecoderSession<'_, B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DecoderSession")
      .field("codec", &self.descriptor.id())
      .field("closed", &self.is_closed())
      .finish()
  }
}
