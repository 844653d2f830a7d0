//! Video presentation core for retroview.
//!
//! An emulation producer writes frames at its own pace in whatever pixel
//! layout it likes; a display consumer presents them through `wgpu` at the
//! display's refresh rate. The flow is:
//!
//! ```text
//!   producer thread                         display thread
//!   ───────────────                         ──────────────
//!   raw pixels ──┐                          Presenter::draw
//!                ├─▶ FrameGate::publish ──▶ FrameGate::present
//!   legacy GL ───┘   (LegacyBridge copies          │
//!                     into the input texture)      ├─▶ GpuUploader (UploadRing)
//!                                                  └─▶ PipelineSet (blit/LCD/CRT)
//! ```
//!
//! * [`format`] maps legacy format/type enumerators to texture formats.
//! * [`descriptor`] captures buffer geometry and replaces it atomically.
//! * [`upload`] stages visible rows into fixed ring slots.
//! * [`sync`] implements the three presentation policies.
//! * [`bridge`] hands frames over from a legacy immediate-mode context.
//! * [`filter`] picks the post-processing pass and its uniform block.
//!
//! Everything except [`gpu`] is GPU-free and unit tested without a device.

mod compile;

pub mod bridge;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod format;
pub mod gpu;
pub mod layout;
pub mod source;
pub mod sync;
pub mod types;
pub mod upload;

pub use bridge::{GraphicsContext, LegacyBridge, SharedSurface, SurfaceAllocator, SurfaceCopier};
pub use descriptor::FrameBufferDescriptor;
pub use error::{BridgeError, DescriptorError, PresentError, UploadError};
pub use filter::{FilterKind, SamplerKind};
pub use format::{resolve, GpuPixelFormat, ResolvedFormat};
pub use gpu::{DrawOutcome, FrameReport, Presenter, PresenterOptions};
pub use source::{live_source, FrameSource, FrameStore};
pub use sync::{FrameGate, Presented, ProducerFlags, SkipReason, SyncPolicy};
pub use types::{CrtFilter, Rect, RenderSettings, ScreenType, SettingsHandle, Size};
pub use upload::{CopyStrategy, UploadRing};
