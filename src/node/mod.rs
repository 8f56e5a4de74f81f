//! Node.js bindings
//!
//! ```js
//! const { decodeProRes, decodeProResAsync } = require('prores-decode')
//!
//! const { width, height, data } = decodeProRes(frameBytes, 1920, 1080)
//! const image = await decodeProResAsync(frameBytes, 1920, 1080, { scaleAlgorithm: 'bicubic' })
//! ```

pub mod error;

use napi::bindgen_prelude::*;
use napi_derive::napi;

use crate::codec::{DecodeOptions, ScaleAlgorithm};
use crate::ffmpeg::decode_prores_with_options;
use crate::image::RgbaImage;

use self::error::decode_error;

/// Chroma interpolation used for the RGBA conversion
#[napi(string_enum)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProResScaleAlgorithm {
  #[napi(value = "fast-bilinear")]
  FastBilinear,
  #[default]
  #[napi(value = "bilinear")]
  Bilinear,
  #[napi(value = "bicubic")]
  Bicubic,
  #[napi(value = "lanczos")]
  Lanczos,
  #[napi(value = "point")]
  Point,
}

impl From<ProResScaleAlgorithm> for ScaleAlgorithm {
  fn from(algorithm: ProResScaleAlgorithm) -> Self {
    match algorithm {
      ProResScaleAlgorithm::FastBilinear => ScaleAlgorithm::FastBilinear,
      ProResScaleAlgorithm::Bilinear => ScaleAlgorithm::Bilinear,
      ProResScaleAlgorithm::Bicubic => ScaleAlgorithm::Bicubic,
      ProResScaleAlgorithm::Lanczos => ScaleAlgorithm::Lanczos,
      ProResScaleAlgorithm::Point => ScaleAlgorithm::Point,
    }
  }
}

/// Optional decode settings
#[napi(object)]
#[derive(Debug, Clone, Default)]
pub struct ProResDecodeOptions {
  /// Decoder threads (0 or omitted lets FFmpeg decide)
  pub thread_count: Option<u32>,
  /// Scaling algorithm for the RGBA conversion (default "bilinear")
  pub scale_algorithm: Option<ProResScaleAlgorithm>,
  /// Full chroma interpolation and accurate rounding (slower)
  pub accurate_rounding: Option<bool>,
}

impl From<ProResDecodeOptions> for DecodeOptions {
  fn from(options: ProResDecodeOptions) -> Self {
    let defaults = DecodeOptions::default();
    DecodeOptions {
      thread_count: options.thread_count.unwrap_or(defaults.thread_count),
      scale_algorithm: options
        .scale_algorithm
        .map(ScaleAlgorithm::from)
        .unwrap_or(defaults.scale_algorithm),
      accurate_rounding: options
        .accurate_rounding
        .unwrap_or(defaults.accurate_rounding),
    }
  }
}

/// Decoded frame as packed RGBA8
#[napi(object)]
pub struct DecodedImage {
  pub width: u32,
  pub height: u32,
  /// width * height * 4 bytes, row-major, no padding
  pub data: Buffer,
}

impl From<RgbaImage> for DecodedImage {
  fn from(image: RgbaImage) -> Self {
    Self {
      width: image.width(),
      height: image.height(),
      data: image.into_raw().into(),
    }
  }
}

/// Decode one ProRes frame synchronously
#[napi(js_name = "decodeProRes")]
pub fn decode_prores(
  data: Buffer,
  width: u32,
  height: u32,
  options: Option<ProResDecodeOptions>,
) -> Result<DecodedImage> {
  let options = options.map(DecodeOptions::from).unwrap_or_default();
  decode_prores_with_options(&data, width, height, options)
    .map(DecodedImage::from)
    .map_err(|err| decode_error(&err))
}

/// Decode work run on the libuv thread pool
pub struct DecodeTask {
  data: Vec<u8>,
  width: u32,
  height: u32,
  options: DecodeOptions,
}

impl Task for DecodeTask {
  type Output = RgbaImage;
  type JsValue = DecodedImage;

  fn compute(&mut self) -> Result<Self::Output> {
    decode_prores_with_options(&self.data, self.width, self.height, self.options)
      .map_err(|err| decode_error(&err))
  }

  fn resolve(&mut self, _env: Env, output: Self::Output) -> Result<Self::JsValue> {
    Ok(DecodedImage::from(output))
  }
}

/// Decode one ProRes frame off the main thread
///
/// The input bytes are copied, so the caller may reuse its buffer right away.
#[napi(js_name = "decodeProResAsync", ts_return_type = "Promise<DecodedImage>")]
pub fn decode_prores_async(
  data: Buffer,
  width: u32,
  height: u32,
  options: Option<ProResDecodeOptions>,
) -> AsyncTask<DecodeTask> {
  AsyncTask::new(DecodeTask {
    data: data.to_vec(),
    width,
    height,
    options: options.map(DecodeOptions::from).unwrap_or_default(),
  })
}
