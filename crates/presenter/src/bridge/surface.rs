use std::fmt;
use std::sync::Arc;

use crate::error::BridgeError;
use crate::types::Size;

/// Bytes per element of every shared surface (BGRA8).
pub const SURFACE_BYTES_PER_ELEMENT: u32 = 4;

/// GPU memory visible to both the legacy API and wgpu.
///
/// Implementations track an external use count the way platform surface
/// objects do; the bridge increments it once when it starts rendering into
/// the surface and decrements it once when it lets go.
pub trait SurfaceMemory: Send + Sync + fmt::Debug {
    fn id(&self) -> u64;

    fn size(&self) -> Size;

    fn increment_use_count(&self);

    fn decrement_use_count(&self);

    /// wgpu view of the same memory, when the backend exposes one.
    fn texture(&self) -> Option<&wgpu::Texture> {
        None
    }
}

pub trait SurfaceAllocator {
    fn allocate(
        &mut self,
        size: Size,
        bytes_per_element: u32,
    ) -> Result<Arc<dyn SurfaceMemory>, BridgeError>;
}

/// Bridge-owned handle on a [`SurfaceMemory`].
///
/// Dropping or releasing the handle decrements the use count; doing both
/// still decrements it only once.
#[derive(Debug)]
pub struct SharedSurface {
    memory: Arc<dyn SurfaceMemory>,
    released: bool,
}

impl SharedSurface {
    pub(crate) fn attach(memory: Arc<dyn SurfaceMemory>) -> Self {
        memory.increment_use_count();
        Self {
            memory,
            released: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.memory.id()
    }

    pub fn size(&self) -> Size {
        self.memory.size()
    }

    pub fn memory(&self) -> &dyn SurfaceMemory {
        self.memory.as_ref()
    }

    pub fn texture(&self) -> Option<&wgpu::Texture> {
        self.memory.texture()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.memory.decrement_use_count();
        tracing::debug!(surface = self.memory.id(), "released shared surface");
    }
}

impl Drop for SharedSurface {
    fn drop(&mut self) {
        self.release();
    }
}
