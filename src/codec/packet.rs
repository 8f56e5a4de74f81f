//! Compressed frame handed to the decoder
//!
//! Provides RAII-based memory management for the encoded ProRes bytes.

use super::status::FFmpegError;
use super::{CodecBackend, DecodeError, DecodeResult};

/// Backend packet holding its own copy of the encoded bytes
///
/// The caller's buffer is copied into library-owned, padded storage, so the
/// decoder never refers to memory the caller may reuse or free.
pub struct PacketBuffer<'a, B: CodecBackend> {
  backend: &'a B,
  handle: Option<B::Packet>,
}

impl<'a, B: CodecBackend> PacketBuffer<'a, B> {
  /// Allocate a packet and copy `data` into it
  pub fn wrap(backend: &'a B, data: &[u8]) -> DecodeResult<Self> {
    if i32::try_from(data.len()).is_err() {
      return Err(DecodeError::AllocationFailed("AVPacket data"));
    }

    let handle = backend
      .alloc_packet()
      .ok_or(DecodeError::AllocationFailed("AVPacket"))?;
    let mut packet = Self {
      backend,
      handle: Some(handle),
    };

    if let Some(handle) = packet.handle.as_mut() {
      let ret = backend.packet_copy_from(handle, data);
      if ret < 0 {
        tracing::warn!(
          target: "prores",
          "failed to copy {} bytes into packet: {}",
          data.len(),
          FFmpegError::from_code(ret)
        );
        return Err(DecodeError::AllocationFailed("AVPacket data"));
      }
    }

    tracing::debug!(target: "prores", size = data.len(), "wrapped packet");
    Ok(packet)
  }

  /// Get packet size in bytes (0 once released)
  pub fn size(&self) -> usize {
    self
      .handle
      .as_ref()
      .map(|handle| self.backend.packet_size(handle))
      .unwrap_or(0)
  }

  /// Check if packet has data
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.size() == 0
  }

  /// Backend handle, or None once released
  pub(crate) fn handle(&self) -> Option<&B::Packet> {
    self.handle.as_ref()
  }

  /// Free the packet and its data; later calls do nothing
  pub fn release(&mut self) {
    if let Some(handle) = self.handle.take() {
      tracing::trace!(target: "prores", "releasing packet");
      self.backend.free_packet(handle);
    }
  }

  /// Whether the packet has been released
  pub fn is_released(&self) -> bool {
    self.handle.is_none()
  }
}

impl<B: CodecBackend> Drop for PacketBuffer<'_, B> {
  fn drop(&mut self) {
    self.release();
  }
}

impl<B: CodecBackend> std::fmt::Debug for PacketBuffer<'_, B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PacketBuffer")
      .field("size", &self.size())
      .field("released", &self.is_released())
      .finish()
  }
}
