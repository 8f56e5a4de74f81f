//! Instrumented in-memory backend for tests
//!
//! `FakeBackend` stands in for FFmpeg. It records every handle it hands out
//! and every handle it gets back, can be told to fail at any step, and
//! "decodes" a tiny frame format: 4 size bytes, the `icpf` ProRes frame
//! marker, then the RGBA colour every pixel should have.

use std::cell::{Cell, RefCell};
use std::os::raw::c_int;

use crate::codec::backend::{CodecBackend, CodecId, Dimensions, PixelFormat, Plane};
use crate::codec::scaler::ScaleConfig;
use crate::codec::status::{
  AVERROR_EAGAIN, AVERROR_EINVAL, AVERROR_ENOMEM, AVERROR_EOF, AVERROR_INVALIDDATA,
};

/// Native format the fake decoder reports
pub(crate) const FAKE_YUV422P10: PixelFormat = PixelFormat::from_raw(64);

/// Byte written into row padding of converted frames
pub(crate) const PAD_BYTE: u8 = 0xEE;

const FRAME_MAGIC: &[u8; 4] = b"icpf";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resource {
  Context,
  Packet,
  Frame,
  Scaler,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Event {
  Acquire(Resource, u32),
  Release(Resource, u32),
}

/// Step at which the fake reports failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FailPoint {
  FindDecoder,
  AllocContext,
  OpenContext,
  AllocPacket,
  PacketData,
  SendPacket,
  NoOutput,
  AllocDecodedFrame,
  CreateScaler,
  AllocConvertedFrame,
  ConvertedBuffer,
  Scale,
}

impl FailPoint {
  pub(crate) const ALL: [FailPoint; 12] = [
    FailPoint::FindDecoder,
    FailPoint::AllocContext,
    FailPoint::OpenContext,
    FailPoint::AllocPacket,
    FailPoint::PacketData,
    FailPoint::SendPacket,
    FailPoint::NoOutput,
    FailPoint::AllocDecodedFrame,
    FailPoint::CreateScaler,
    FailPoint::AllocConvertedFrame,
    FailPoint::ConvertedBuffer,
    FailPoint::Scale,
  ];
}

/// Encode a fake frame whose pixels should all decode to `rgba`
pub(crate) fn fake_frame(rgba: [u8; 4]) -> Vec<u8> {
  let mut data = Vec::with_capacity(12);
  data.extend_from_slice(&12u32.to_be_bytes());
  data.extend_from_slice(FRAME_MAGIC);
  data.extend_from_slice(&rgba);
  data
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FakeCodec;

pub(crate) struct FakeContext {
  id: u32,
  opened: bool,
  dims: Option<Dimensions>,
  pending: Option<[u8; 4]>,
  flushed: bool,
  format: PixelFormat,
}

pub(crate) struct FakePacket {
  id: u32,
  data: Vec<u8>,
}

pub(crate) struct FakeFrame {
  id: u32,
  width: u32,
  height: u32,
  format: PixelFormat,
  color: [u8; 4],
  data: Vec<u8>,
  linesize: usize,
}

pub(crate) struct FakeScaler {
  id: u32,
  dims: Dimensions,
}

pub(crate) struct FakeBackend {
  fail: Option<FailPoint>,
  padding: usize,
  decoded_size: Option<(u32, u32)>,
  decoded_format: PixelFormat,
  next_id: Cell<u32>,
  lookups: Cell<u32>,
  frames_allocated: Cell<u32>,
  events: RefCell<Vec<Event>>,
}

impl FakeBackend {
  pub(crate) fn new() -> Self {
    Self {
      fail: None,
      padding: 0,
      decoded_size: None,
      decoded_format: FAKE_YUV422P10,
      next_id: Cell::new(1),
      lookups: Cell::new(0),
      frames_allocated: Cell::new(0),
      events: RefCell::new(Vec::new()),
    }
  }

  pub(crate) fn failing_at(point: FailPoint) -> Self {
    Self {
      fail: Some(point),
      ..Self::new()
    }
  }

  /// Pad every converted row with `bytes` extra bytes
  pub(crate) fn with_padding(mut self, bytes: usize) -> Self {
    self.padding = bytes;
    self
  }

  /// Make the decoder report a different frame size than requested
  pub(crate) fn with_decoded_size(mut self, width: u32, height: u32) -> Self {
    self.decoded_size = Some((width, height));
    self
  }

  pub(crate) fn with_decoded_format(mut self, format: PixelFormat) -> Self {
    self.decoded_format = format;
    self
  }

  pub(crate) fn lookups(&self) -> u32 {
    self.lookups.get()
  }

  pub(crate) fn events(&self) -> Vec<Event> {
    self.events.borrow().clone()
  }

  /// Handles acquired and not yet released
  pub(crate) fn outstanding(&self) -> usize {
    let events = self.events.borrow();
    let acquired = events
      .iter()
      .filter(|e| matches!(e, Event::Acquire(..)))
      .count();
    acquired - (events.len() - acquired)
  }

  /// Assert every handle was released exactly once, in reverse order of
  /// acquisition.
  pub(crate) fn assert_released_in_reverse(&self) {
    let events = self.events.borrow();
    let acquired: Vec<(Resource, u32)> = events
      .iter()
      .filter_map(|e| match *e {
        Event::Acquire(r, id) => Some((r, id)),
        Event::Release(..) => None,
      })
      .collect();
    let released: Vec<(Resource, u32)> = events
      .iter()
      .filter_map(|e| match *e {
        Event::Release(r, id) => Some((r, id)),
        Event::Acquire(..) => None,
      })
      .collect();
    let expected: Vec<(Resource, u32)> = acquired.iter().rev().copied().collect();
    assert_eq!(released, expected, "events: {:?}", *events);
  }

  /// Number of acquisitions of a resource type
  pub(crate) fn acquired(&self, resource: Resource) -> usize {
    self
      .events
      .borrow()
      .iter()
      .filter(|e| matches!(e, Event::Acquire(r, _) if *r == resource))
      .count()
  }

  fn fails(&self, point: FailPoint) -> bool {
    self.fail == Some(point)
  }

  fn acquire(&self, resource: Resource) -> u32 {
    let id = self.next_id.get();
    self.next_id.set(id + 1);
    self.events.borrow_mut().push(Event::Acquire(resource, id));
    id
  }

  fn release(&self, resource: Resource, id: u32) {
    let mut events = self.events.borrow_mut();
    assert!(
      events.contains(&Event::Acquire(resource, id)),
      "{:?} {} released but never acquired",
      resource,
      id
    );
    assert!(
      !events.contains(&Event::Release(resource, id)),
      "{:?} {} released twice",
      resource,
      id
    );
    events.push(Event::Release(resource, id));
  }
}

impl CodecBackend for FakeBackend {
  type Codec = FakeCodec;
  type Context = FakeContext;
  type Packet = FakePacket;
  type Frame = FakeFrame;
  type Scaler = FakeScaler;

  fn find_decoder(&self, _id: CodecId) -> Option<FakeCodec> {
    self.lookups.set(self.lookups.get() + 1);
    (!self.fails(FailPoint::FindDecoder)).then_some(FakeCodec)
  }

  fn codec_name(&self, _codec: FakeCodec) -> String {
    "fake-prores".into()
  }

  fn alloc_context(&self, _codec: FakeCodec) -> Option<FakeContext> {
    if self.fails(FailPoint::AllocContext) {
      return None;
    }
    Some(FakeContext {
      id: self.acquire(Resource::Context),
      opened: false,
      dims: None,
      pending: None,
      flushed: false,
      format: PixelFormat::NONE,
    })
  }

  fn set_thread_count(&self, _ctx: &mut FakeContext, _count: u32) {}

  fn open_context(&self, ctx: &mut FakeContext, _codec: FakeCodec) -> c_int {
    if self.fails(FailPoint::OpenContext) {
      return AVERROR_EINVAL;
    }
    ctx.opened = true;
    0
  }

  fn set_dimensions(&self, ctx: &mut FakeContext, dims: Dimensions) {
    ctx.dims = Some(dims);
  }

  fn context_format(&self, ctx: &FakeContext) -> PixelFormat {
    ctx.format
  }

  fn free_context(&self, ctx: FakeContext) {
    self.release(Resource::Context, ctx.id);
  }

  fn alloc_packet(&self) -> Option<FakePacket> {
    if self.fails(FailPoint::AllocPacket) {
      return None;
    }
    Some(FakePacket {
      id: self.acquire(Resource::Packet),
      data: Vec::new(),
    })
  }

  fn packet_copy_from(&self, pkt: &mut FakePacket, data: &[u8]) -> c_int {
    if self.fails(FailPoint::PacketData) {
      return AVERROR_ENOMEM;
    }
    pkt.data = data.to_vec();
    0
  }

  fn packet_size(&self, pkt: &FakePacket) -> usize {
    pkt.data.len()
  }

  fn free_packet(&self, pkt: FakePacket) {
    self.release(Resource::Packet, pkt.id);
  }

  fn send_packet(&self, ctx: &mut FakeContext, pkt: Option<&FakePacket>) -> c_int {
    assert!(ctx.opened, "packet sent to an unopened context");
    let Some(pkt) = pkt else {
      ctx.flushed = true;
      return 0;
    };
    if self.fails(FailPoint::SendPacket) {
      return AVERROR_INVALIDDATA;
    }
    let data = &pkt.data;
    if data.len() < 12 || &data[4..8] != FRAME_MAGIC {
      return AVERROR_INVALIDDATA;
    }
    if !self.fails(FailPoint::NoOutput) {
      ctx.pending = Some([data[8], data[9], data[10], data[11]]);
    }
    0
  }

  fn receive_frame(&self, ctx: &mut FakeContext, frame: &mut FakeFrame) -> c_int {
    let Some(color) = ctx.pending.take() else {
      return if ctx.flushed {
        AVERROR_EOF
      } else {
        AVERROR_EAGAIN
      };
    };
    let Some(dims) = ctx.dims else {
      return AVERROR_EINVAL;
    };
    let (width, height) = self
      .decoded_size
      .unwrap_or((dims.width(), dims.height()));
    frame.width = width;
    frame.height = height;
    frame.format = self.decoded_format;
    frame.color = color;
    ctx.format = self.decoded_format;
    0
  }

  fn alloc_frame(&self) -> Option<FakeFrame> {
    let nth = self.frames_allocated.get() + 1;
    self.frames_allocated.set(nth);
    if (nth == 1 && self.fails(FailPoint::AllocDecodedFrame))
      || (nth == 2 && self.fails(FailPoint::AllocConvertedFrame))
    {
      return None;
    }
    Some(FakeFrame {
      id: self.acquire(Resource::Frame),
      width: 0,
      height: 0,
      format: PixelFormat::NONE,
      color: [0; 4],
      data: Vec::new(),
      linesize: 0,
    })
  }

  fn frame_get_buffer(
    &self,
    frame: &mut FakeFrame,
    dims: Dimensions,
    format: PixelFormat,
  ) -> c_int {
    if self.fails(FailPoint::ConvertedBuffer) {
      return AVERROR_ENOMEM;
    }
    if format != PixelFormat::RGBA {
      return AVERROR_EINVAL;
    }
    frame.width = dims.width();
    frame.height = dims.height();
    frame.format = format;
    frame.linesize = dims.rgba_row_bytes() + self.padding;
    frame.data = vec![PAD_BYTE; frame.linesize * dims.height() as usize];
    0
  }

  fn frame_dimensions(&self, frame: &FakeFrame) -> (u32, u32) {
    (frame.width, frame.height)
  }

  fn frame_format(&self, frame: &FakeFrame) -> PixelFormat {
    frame.format
  }

  fn frame_plane<'a>(&self, frame: &'a FakeFrame, plane: usize, rows: usize) -> Option<Plane<'a>> {
    if plane != 0 || frame.data.is_empty() {
      return None;
    }
    let len = (frame.linesize * rows).min(frame.data.len());
    Some(Plane {
      data: &frame.data[..len],
      linesize: frame.linesize,
    })
  }

  fn free_frame(&self, frame: FakeFrame) {
    self.release(Resource::Frame, frame.id);
  }

  fn create_scaler(
    &self,
    src_format: PixelFormat,
    _dst_format: PixelFormat,
    dims: Dimensions,
    _config: ScaleConfig,
  ) -> Option<FakeScaler> {
    if self.fails(FailPoint::CreateScaler) || src_format.is_none() {
      return None;
    }
    Some(FakeScaler {
      id: self.acquire(Resource::Scaler),
      dims,
    })
  }

  fn scale(
    &self,
    scaler: &mut FakeScaler,
    src: &FakeFrame,
    dst: &mut FakeFrame,
    rows: u32,
  ) -> c_int {
    if self.fails(FailPoint::Scale) {
      return AVERROR_EINVAL;
    }
    let row_bytes = scaler.dims.rgba_row_bytes();
    for row in 0..rows as usize {
      let start = row * dst.linesize;
      for pixel in dst.data[start..start + row_bytes].chunks_exact_mut(4) {
        pixel.copy_from_slice(&src.color);
      }
    }
    rows as c_int
  }

  fn free_scaler(&self, scaler: FakeScaler) {
    self.release(Resource::Scaler, scaler.id);
  }
}
