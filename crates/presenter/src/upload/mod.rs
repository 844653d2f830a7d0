//! CPU side of the frame upload path.
//!
//! Raw producer rows are staged into one of `depth` fixed slots
//! (`frame % depth`), cropped to the visible rectangle and laid out with a
//! GPU-copyable stride. The GPU copy out of a slot is recorded separately;
//! until [`UploadRing::mark_issued`] runs for a frame its slot refuses new
//! data, and the ring tracks the oldest such frame as a watermark.

mod texel;

pub use texel::{Conversion, PackedLayout, TexelEncoding};

use crate::descriptor::FrameBufferDescriptor;
use crate::error::UploadError;
use crate::types::Size;

/// Triple buffering unless configured otherwise. Must exceed the number of
/// frames the GPU keeps queued.
pub const DEFAULT_RING_DEPTH: usize = 3;

/// Rounds a row stride up to the texture copy alignment.
///
/// Descriptors bound `width` by [`crate::descriptor::MAX_DIMENSION`], which
/// keeps the product inside `u32`; larger inputs saturate.
pub fn aligned_row_bytes(width: u32, texel_bytes: u32) -> u32 {
    let tight = width.saturating_mul(texel_bytes);
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    tight.div_ceil(align).saturating_mul(align)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyStrategy {
    /// One pass over the contiguous block of visible rows.
    Fast,
    /// Row-by-row copy starting at the visible origin.
    Scanline,
}

impl CopyStrategy {
    /// Fast path when the crop starts at column zero and keeps at least half
    /// of every source row.
    pub fn choose(descriptor: &FrameBufferDescriptor) -> Self {
        let rect = descriptor.screen_rect();
        let buffer_width = u64::from(descriptor.buffer_size().width);
        if rect.x == 0 && u64::from(rect.width) * 2 >= buffer_width {
            Self::Fast
        } else {
            Self::Scanline
        }
    }
}

/// Layout of a staged frame inside its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StagingLayout {
    pub extent: Size,
    /// Aligned staging stride.
    pub bytes_per_row: u32,
    /// Bytes of pixel data per row before padding.
    pub row_bytes: u32,
}

impl StagingLayout {
    pub fn new(descriptor: &FrameBufferDescriptor, encoding: &TexelEncoding) -> Self {
        let extent = descriptor.screen_rect().size();
        Self {
            extent,
            bytes_per_row: aligned_row_bytes(extent.width, encoding.texel_bytes),
            row_bytes: extent.width * encoding.texel_bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes_per_row as usize * self.extent.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of staging one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StagedFrame {
    pub frame: u64,
    pub slot: usize,
    pub strategy: CopyStrategy,
    pub layout: StagingLayout,
    /// Number of block copies performed (1 for a single contiguous copy).
    pub copy_calls: usize,
}

/// Copies the visible rows of `src` into `dst` with one contiguous pass.
///
/// Returns the number of copy calls issued.
pub fn stage_fast(
    descriptor: &FrameBufferDescriptor,
    encoding: &TexelEncoding,
    src: &[u8],
    dst: &mut [u8],
) -> usize {
    let layout = StagingLayout::new(descriptor, encoding);
    let rect = descriptor.screen_rect();
    let source_stride = descriptor.source_row_bytes();
    let staging_stride = layout.bytes_per_row as usize;
    let visible_src = descriptor.visible_row_bytes();
    let column = rect.x as usize * descriptor.bytes_per_pixel() as usize;
    let start = rect.y as usize * source_stride + column;
    let rows = rect.height as usize;

    // Rows are only contiguous when nothing is cropped on either side.
    let unpadded = column == 0 && visible_src == source_stride && source_stride == staging_stride;
    if encoding.is_copy() && unpadded {
        let len = rows * source_stride;
        dst[..len].copy_from_slice(&src[start..start + len]);
        return 1;
    }

    let block_len = (rows - 1) * source_stride + visible_src;
    let block = &src[start..start + block_len];
    for (row, out) in block
        .chunks(source_stride)
        .zip(dst.chunks_mut(staging_stride))
        .take(rows)
    {
        write_row(encoding, &row[..visible_src], out, layout.row_bytes as usize);
    }
    rows
}

/// Copies each visible row individually from `origin.x * bytes_per_pixel`.
pub fn stage_scanlines(
    descriptor: &FrameBufferDescriptor,
    encoding: &TexelEncoding,
    src: &[u8],
    dst: &mut [u8],
) -> usize {
    let layout = StagingLayout::new(descriptor, encoding);
    let rect = descriptor.screen_rect();
    let source_stride = descriptor.source_row_bytes();
    let staging_stride = layout.bytes_per_row as usize;
    let visible_src = descriptor.visible_row_bytes();
    let column = rect.x as usize * descriptor.bytes_per_pixel() as usize;

    for row in 0..rect.height as usize {
        let offset = (rect.y as usize + row) * source_stride + column;
        let out = &mut dst[row * staging_stride..(row + 1) * staging_stride];
        write_row(
            encoding,
            &src[offset..offset + visible_src],
            out,
            layout.row_bytes as usize,
        );
    }
    rect.height as usize
}

fn write_row(encoding: &TexelEncoding, src: &[u8], out: &mut [u8], row_bytes: usize) {
    let (pixels, padding) = out.split_at_mut(row_bytes);
    encoding.convert_row(src, pixels);
    padding.fill(0);
}

/// Minimum source length that covers every visible byte.
fn required_source_len(descriptor: &FrameBufferDescriptor) -> usize {
    let rect = descriptor.screen_rect();
    let bytes_per_pixel = descriptor.bytes_per_pixel() as usize;
    let last_row = (rect.y + rect.height - 1) as usize;
    last_row * descriptor.source_row_bytes() + (rect.x + rect.width) as usize * bytes_per_pixel
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Free,
    /// Staged and waiting for its GPU copy to be issued.
    InFlight { frame: u64 },
}

#[derive(Debug)]
struct UploadSlot {
    data: Vec<u8>,
    state: SlotState,
}

/// Fixed arena of staging slots indexed by `frame % depth`.
#[derive(Debug)]
pub struct UploadRing {
    slots: Vec<UploadSlot>,
    capacity: usize,
    oldest_in_flight: Option<u64>,
}

impl UploadRing {
    pub fn new(depth: usize) -> Result<Self, UploadError> {
        if depth == 0 {
            return Err(UploadError::ZeroDepth);
        }
        let slots = (0..depth)
            .map(|_| UploadSlot {
                data: Vec::new(),
                state: SlotState::Free,
            })
            .collect();
        Ok(Self {
            slots,
            capacity: 0,
            oldest_in_flight: None,
        })
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Bytes each slot can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sizes the ring for a full buffer of `descriptor`'s geometry.
    ///
    /// Free slots are reallocated immediately; a slot still in flight keeps
    /// its pending bytes and is resized the next time it is staged.
    pub fn reserve_for(
        &mut self,
        descriptor: &FrameBufferDescriptor,
        encoding: &TexelEncoding,
    ) -> Result<(), UploadError> {
        let buffer = descriptor.buffer_size();
        let capacity =
            aligned_row_bytes(buffer.width, encoding.texel_bytes) as usize * buffer.height as usize;
        if capacity == 0 {
            tracing::error!(?buffer, "upload slot would be empty; skipping allocation");
            return Err(UploadError::EmptySlot { buffer });
        }
        if capacity != self.capacity {
            tracing::debug!(
                depth = self.depth(),
                capacity,
                previous = self.capacity,
                "resizing upload ring"
            );
            for slot in &mut self.slots {
                if slot.state == SlotState::Free {
                    slot.data = vec![0; capacity];
                }
            }
            self.capacity = capacity;
        }
        Ok(())
    }

    pub fn slot_index(&self, frame: u64) -> usize {
        (frame % self.slots.len() as u64) as usize
    }

    /// Stages the visible part of `pixels` for `frame`.
    ///
    /// Fails with [`UploadError::SlotInFlight`] when the slot still holds a
    /// frame whose GPU copy has not been issued.
    pub fn stage(
        &mut self,
        frame: u64,
        descriptor: &FrameBufferDescriptor,
        encoding: &TexelEncoding,
        pixels: &[u8],
    ) -> Result<StagedFrame, UploadError> {
        let expected = required_source_len(descriptor);
        if pixels.len() < expected {
            return Err(UploadError::SourceTooShort {
                expected,
                actual: pixels.len(),
            });
        }
        let index = self.slot_index(frame);
        if let SlotState::InFlight { frame: pending } = self.slots[index].state {
            return Err(UploadError::SlotInFlight {
                slot: index,
                pending,
            });
        }
        self.reserve_for(descriptor, encoding)?;

        let capacity = self.capacity;
        let slot = &mut self.slots[index];
        if slot.data.len() != capacity {
            slot.data = vec![0; capacity];
        }

        let strategy = CopyStrategy::choose(descriptor);
        let copy_calls = match strategy {
            CopyStrategy::Fast => stage_fast(descriptor, encoding, pixels, &mut slot.data),
            CopyStrategy::Scanline => stage_scanlines(descriptor, encoding, pixels, &mut slot.data),
        };
        slot.state = SlotState::InFlight { frame };
        self.refresh_watermark();

        Ok(StagedFrame {
            frame,
            slot: index,
            strategy,
            layout: StagingLayout::new(descriptor, encoding),
            copy_calls,
        })
    }

    /// Staged bytes for `slot`.
    pub fn slot_bytes(&self, slot: usize) -> &[u8] {
        &self.slots[slot].data
    }

    /// Returns a slot to the ring once its copy command has been issued.
    pub fn mark_issued(&mut self, frame: u64) -> Result<(), UploadError> {
        let index = self.slot_index(frame);
        let slot = &mut self.slots[index];
        match slot.state {
            SlotState::InFlight { frame: pending } if pending == frame => {
                slot.state = SlotState::Free;
                self.refresh_watermark();
                Ok(())
            }
            _ => Err(UploadError::NotAcquired { frame }),
        }
    }

    /// Releases a staged frame whose copy was abandoned.
    pub fn discard(&mut self, frame: u64) {
        if self.mark_issued(frame).is_ok() {
            tracing::debug!(frame, "discarded staged frame");
        }
    }

    pub fn oldest_in_flight(&self) -> Option<u64> {
        self.oldest_in_flight
    }

    pub fn in_flight(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.state, SlotState::InFlight { .. }))
            .count()
    }

    fn refresh_watermark(&mut self) {
        self.oldest_in_flight = self
            .slots
            .iter()
            .filter_map(|slot| match slot.state {
                SlotState::InFlight { frame } => Some(frame),
                SlotState::Free => None,
            })
            .min();
    }
}
