//! Tightly packed RGBA8 output image
//!
//! Converted frames usually carry row padding (linesize > width * 4). The
//! builder copies them row by row into a buffer with no padding, which is the
//! only thing a decode hands back to the caller.

use crate::codec::{CodecBackend, DecodeError, DecodeResult, Dimensions, Frame};

/// Decoded picture as packed, row-major RGBA8
#[derive(Clone, PartialEq, Eq)]
pub struct RgbaImage {
  width: u32,
  height: u32,
  data: Vec<u8>,
}

impl RgbaImage {
  #[inline]
  pub fn width(&self) -> u32 {
    self.width
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.height
  }

  /// Pixel bytes, exactly `width * height * 4` long
  #[inline]
  pub fn data(&self) -> &[u8] {
    &self.data
  }

  /// Bytes per row
  #[inline]
  pub fn stride(&self) -> usize {
    self.width as usize * Dimensions::RGBA_BYTES_PER_PIXEL
  }

  /// One row of pixels, or None past the last row
  pub fn row(&self, y: u32) -> Option<&[u8]> {
    if y >= self.height {
      return None;
    }
    let start = y as usize * self.stride();
    self.data.get(start..start + self.stride())
  }

  /// RGBA value at (x, y), or None outside the image
  pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
    if x >= self.width {
      return None;
    }
    let start = x as usize * Dimensions::RGBA_BYTES_PER_PIXEL;
    let px = self.row(y)?.get(start..start + Dimensions::RGBA_BYTES_PER_PIXEL)?;
    Some([px[0], px[1], px[2], px[3]])
  }

  /// Take ownership of the pixel buffer
  pub fn into_raw(self) -> Vec<u8> {
    self.data
  }
}

impl std::fmt::Debug for RgbaImage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RgbaImage")
      .field("width", &self.width)
      .field("height", &self.height)
      .field("len", &self.data.len())
      .finish()
  }
}

/// Copy `rows` rows of `row_bytes` bytes between two strided buffers
///
/// Fails without writing anything if either buffer is too short or a stride
/// is smaller than a row.
pub fn copy_plane(
  src: &[u8],
  src_stride: usize,
  dst: &mut [u8],
  dst_stride: usize,
  row_bytes: usize,
  rows: usize,
) -> DecodeResult<()> {
  if rows == 0 || row_bytes == 0 {
    return Ok(());
  }
  if src_stride < row_bytes || dst_stride < row_bytes {
    return Err(DecodeError::ConversionFailed(format!(
      "stride smaller than row: src {}, dst {}, row {}",
      src_stride, dst_stride, row_bytes
    )));
  }

  // The last row only needs `row_bytes`, not a full stride.
  let needed = |stride: usize| {
    (rows - 1)
      .checked_mul(stride)
      .and_then(|n| n.checked_add(row_bytes))
  };
  match (needed(src_stride), needed(dst_stride)) {
    (Some(s), Some(d)) if s <= src.len() && d <= dst.len() => {}
    _ => {
      return Err(DecodeError::ConversionFailed(format!(
        "plane too short for {} rows of {} bytes (src {}, dst {})",
        rows,
        row_bytes,
        src.len(),
        dst.len()
      )));
    }
  }

  for row in 0..rows {
    let s = row * src_stride;
    let d = row * dst_stride;
    dst[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
  }

  Ok(())
}

/// Builds the caller-facing image from a converted frame
pub struct OutputImageBuilder;

impl OutputImageBuilder {
  /// Copy plane 0 of an RGBA frame into a packed image
  pub fn extract<B: CodecBackend>(
    frame: &Frame<'_, B>,
    dims: Dimensions,
  ) -> DecodeResult<RgbaImage> {
    let rows = dims.height() as usize;
    let row_bytes = dims.rgba_row_bytes();
    let len = dims.rgba_len();

    let plane = frame
      .plane(0, rows)
      .ok_or_else(|| DecodeError::ConversionFailed("converted frame has no data plane".into()))?;
    if plane.linesize < row_bytes {
      return Err(DecodeError::ConversionFailed(format!(
        "converted linesize {} is smaller than {} bytes per row",
        plane.linesize, row_bytes
      )));
    }

    let mut data = Vec::new();
    data
      .try_reserve_exact(len)
      .map_err(|_| DecodeError::ExtractionFailed(len))?;
    data.resize(len, 0);

    copy_plane(plane.data, plane.linesize, &mut data, row_bytes, row_bytes, rows)?;

    Ok(RgbaImage {
      width: dims.width(),
      height: dims.height(),
      data,
    })
  }
}
