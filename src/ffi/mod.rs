//! Hand-written FFmpeg C bindings (no bindgen)
//!
//! Covers only what single-frame ProRes decoding needs: libavcodec decode,
//! libavutil frames and diagnostics, libswscale conversion. All FFmpeg structs
//! are opaque - we access fields via the thin C accessor library.

pub mod accessors;
pub mod avcodec;
pub mod avutil;
pub mod swscale;
pub mod types;

pub use types::*;
