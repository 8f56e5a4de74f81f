//! Single-frame decode pipeline
//!
//! Drives the sessions in a fixed order: open decoder, wrap packet, decode,
//! open converter, convert, extract. Each step's resource is a local declared
//! after the ones it depends on, so any early return drops what was acquired
//! in exactly the reverse order.

use crate::codec::{
  CodecBackend, CodecDescriptor, ConversionSession, DecodeOptions, DecodeResult, DecoderSession,
  Dimensions, PacketBuffer, PixelFormat,
};
use crate::image::{OutputImageBuilder, RgbaImage};

/// Decodes one encoded frame into an [`RgbaImage`]
///
/// Holds no decode state between calls; only the backend reference, the
/// resolved codec and the options are kept.
pub struct DecodePipeline<'b, B: CodecBackend> {
  backend: &'b B,
  descriptor: CodecDescriptor<B::Codec>,
  options: DecodeOptions,
}

impl<'b, B: CodecBackend> DecodePipeline<'b, B> {
  pub fn new(backend: &'b B, descriptor: CodecDescriptor<B::Codec>) -> Self {
    Self {
      backend,
      descriptor,
      options: DecodeOptions::default(),
    }
  }

  pub fn with_options(mut self, options: DecodeOptions) -> Self {
    self.options = options;
    self
  }

  #[inline]
  pub fn options(&self) -> &DecodeOptions {
    &self.options
  }

  /// Decode `data`, which must hold exactly one frame of `width` x `height`
  pub fn decode(&self, data: &[u8], width: u32, height: u32) -> DecodeResult<RgbaImage> {
    self.run(data, width, height).inspect_err(|err| {
      tracing::warn!(
        target: "prores",
        kind = ?err.kind(),
        "failed to decode {} byte frame at {}x{}: {}",
        data.len(),
        width,
        height,
        err
      );
    })
  }

  fn run(&self, data: &[u8], width: u32, height: u32) -> DecodeResult<RgbaImage> {
    let dims = Dimensions::new(width, height)?;

    let mut decoder = DecoderSession::open(self.backend, &self.descriptor, &self.options)?;
    let packet = PacketBuffer::wrap(self.backend, data)?;
    let decoded = decoder.decode_one(&packet, dims)?;

    let mut converter = ConversionSession::open(
      self.backend,
      decoded.source_format(),
      PixelFormat::RGBA,
      dims,
      self.options.scale_config(),
    )?;
    let converted = converter.convert(&decoded)?;

    OutputImageBuilder::extract(&converted, dims)
  }
}

impl<B: CodecBackend> std::fmt::Debug for DecodePipeline<'_, B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DecodePipeline")
      .field("codec", &self.descriptor.id())
      .field("options", &self.options)
      .finish()
  }
}
