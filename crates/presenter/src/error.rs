use crate::types::{Rect, Size};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("frame buffer must not be empty (got {size:?})")]
    EmptyBuffer { size: Size },
    #[error("frame buffer {size:?} exceeds the {max} pixel edge limit")]
    TooLarge { size: Size, max: u32 },
    #[error("visible rectangle must not be empty (got {rect:?})")]
    EmptyScreenRect { rect: Rect },
    #[error("visible rectangle {rect:?} exceeds frame buffer {buffer:?}")]
    ScreenRectOutOfBounds { rect: Rect, buffer: Size },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("upload ring depth must be at least 1")]
    ZeroDepth,
    #[error("upload slot {slot} still holds frame {pending} whose copy was never issued")]
    SlotInFlight { slot: usize, pending: u64 },
    #[error("frame {frame} was not acquired from the upload ring")]
    NotAcquired { frame: u64 },
    #[error("source buffer holds {actual} bytes but the descriptor needs {expected}")]
    SourceTooShort { expected: usize, actual: usize },
    #[error("upload slot capacity is zero for {buffer:?}")]
    EmptySlot { buffer: Size },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("legacy context call failed: {0}")]
    Context(String),
    #[error("failed to allocate shared surface of {size:?}: {reason}")]
    Allocation { size: Size, reason: String },
    #[error("shared surface is {surface:?} but producer now reports {requested:?}; recreate the bridge")]
    GeometryMismatch { surface: Size, requested: Size },
    #[error("copy region {rect:?} falls outside the shared surface {surface:?}")]
    RegionOutOfBounds { rect: Rect, surface: Size },
    #[error("frame finished before the bridge was started")]
    NotStarted,
    #[error("bridge has already been torn down")]
    TornDown,
    #[error("unified input texture copy failed: {0}")]
    Copy(String),
}

/// Errors surfaced from a display tick. Resource-absent conditions are not
/// errors; they come back as skipped frames instead.
#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}
