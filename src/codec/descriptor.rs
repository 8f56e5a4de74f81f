//! Codec descriptor lookup
//!
//! The decoder implementation is looked up once and never changes afterwards,
//! so the result is kept in a [`DescriptorCell`] that is safe to read from any
//! thread. Sessions receive the descriptor as a value instead of consulting
//! global state.

use std::sync::OnceLock;

use super::{CodecBackend, CodecId, DecodeError, DecodeResult};

/// Resolved decoder implementation for one codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecDescriptor<C> {
  id: CodecId,
  codec: C,
}

impl<C: Copy> CodecDescriptor<C> {
  /// Look the decoder up in the backend
  pub fn resolve<B>(backend: &B, id: CodecId) -> DecodeResult<Self>
  where
    B: CodecBackend<Codec = C>,
  {
    let codec = backend
      .find_decoder(id)
      .ok_or(DecodeError::DecoderNotFound(id))?;

    tracing::debug!(
      target: "prores",
      codec = %backend.codec_name(codec),
      "resolved {:?} decoder",
      id
    );

    Ok(Self { id, codec })
  }

  /// Wrap an already resolved codec handle
  pub fn from_parts(id: CodecId, codec: C) -> Self {
    Self { id, codec }
  }

  #[inline]
  pub fn id(&self) -> CodecId {
    self.id
  }

  #[inline]
  pub fn codec(&self) -> C {
    self.codec
  }
}

/// Lazily resolved, read-only descriptor slot
///
/// The first call to [`DescriptorCell::get_or_resolve`] performs the lookup;
/// every later call returns the stored outcome, including "not found".
pub struct DescriptorCell<C> {
  id: CodecId,
  cell: OnceLock<Option<CodecDescriptor<C>>>,
}

impl<C: Copy + Send + Sync + 'static> DescriptorCell<C> {
  pub const fn new(id: CodecId) -> Self {
    Self {
      id,
      cell: OnceLock::new(),
    }
  }

  pub fn get_or_resolve<B>(&self, backend: &B) -> DecodeResult<CodecDescriptor<C>>
  where
    B: CodecBackend<Codec = C>,
  {
    self
      .cell
      .get_or_init(|| CodecDescriptor::resolve(backend, self.id).ok())
      .ok_or(DecodeError::DecoderNotFound(self.id))
  }

  /// Whether the lookup has already happened
  pub fn is_resolved(&self) -> bool {
    self.cell.get().is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::codec::ErrorKind;
  use crate::testing::{FailPoint, FakeBackend};

  #[test]
  fn test_resolve_finds_decoder() {
    let backend = FakeBackend::new();
    let descriptor = CodecDescriptor::resolve(&backend, CodecId::ProRes).unwrap();
    assert_eq!(descriptor.id(), CodecId::ProRes);
    assert_eq!(backend.lookups(), 1);
  }

  #[test]
  fn test_resolve_missing_decoder() {
    let backend = FakeBackend::failing_at(FailPoint::FindDecoder);
    let err = CodecDescriptor::resolve(&backend, CodecId::ProRes).unwrap_err();
    assert!(matches!(err, DecodeError::DecoderNotFound(CodecId::ProRes)));
    assert_eq!(err.kind(), ErrorKind::Open);
  }

  #[test]
  fn test_cell_resolves_once() {
    let backend = FakeBackend::new();
    let cell = DescriptorCell::new(CodecId::ProRes);
    assert!(!cell.is_resolved());

    let first = cell.get_or_resolve(&backend).unwrap();
    let second = cell.get_or_resolve(&backend).unwrap();

    assert!(cell.is_resolved());
    assert_eq!(first, second);
    assert_eq!(backend.lookups(), 1);
  }

  #[test]
  fn test_cell_remembers_missing_decoder() {
    let backend = FakeBackend::failing_at(FailPoint::FindDecoder);
    let cell = DescriptorCell::new(CodecId::ProRes);

    assert!(cell.get_or_resolve(&backend).is_err());
    assert!(cell.get_or_resolve(&backend).is_err());
    assert_eq!(backend.lookups(), 1);
  }
}
