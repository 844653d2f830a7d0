//! `wgpu` backend.
//!
//! - `context` owns the instance, device and window surface and reconfigures
//!   the swapchain on resize.
//! - `input` holds the unified input texture and the GPU half of the upload
//!   ring.
//! - `shared` backs legacy shared surfaces with textures and copies them into
//!   the input texture.
//! - `pipeline` builds one render pipeline per filter kind, falling back to
//!   the blit when a build fails.
//! - `state` glues everything together behind [`Presenter`].

mod context;
mod input;
mod pipeline;
mod shared;
mod state;

pub use input::{GpuUploader, InputGeometry, InputTexture};
pub use shared::{GpuSurfaceAllocator, GpuSurfaceCopier, GpuSurfaceMemory, SHARED_SURFACE_FORMAT};
pub use state::{DrawOutcome, FrameReport, PresentStats, Presenter, PresenterOptions};
