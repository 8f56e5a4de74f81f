#![deny(clippy::all)]

//! Single-frame ProRes decoding to packed RGBA8
//!
//! The decode pipeline is written against the [`CodecBackend`] trait; the
//! `ffmpeg` feature provides the FFmpeg implementation and the `node` feature
//! exposes it to JavaScript through NAPI-RS.
//!
//! ```ignore
//! let image = prores_decode::decode_prores(&frame_bytes, 1920, 1080)?;
//! assert_eq!(image.data().len(), 1920 * 1080 * 4);
//! ```

// Safe codec wrappers (RAII)
pub mod codec;

// Packed output image and plane copying
pub mod image;

// Decode pipeline driving the wrappers
pub mod pipeline;

// FFmpeg C bindings (hand-written, no bindgen)
#[cfg(feature = "ffmpeg")]
pub mod ffi;

// FFmpeg implementation of the codec backend
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

// Node.js API surface
#[cfg(feature = "node")]
pub mod node;

#[cfg(test)]
mod testing;

// Statically linked FFmpeg needs zlib symbols
#[cfg(feature = "ffmpeg")]
use libz_sys as _;

pub use codec::{
  CodecBackend, CodecId, DecodeError, DecodeOptions, DecodeResult, Dimensions, ErrorKind,
  FFmpegError, PixelFormat, ScaleAlgorithm,
};
pub use image::{copy_plane, OutputImageBuilder, RgbaImage};
pub use pipeline::DecodePipeline;

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{decode_prores, decode_prores_with_options, FfmpegBackend, LogLevel};
