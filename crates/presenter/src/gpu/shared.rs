use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use crate::bridge::{SharedSurface, SurfaceAllocator, SurfaceCopier, SurfaceMemory};
use crate::error::BridgeError;
use crate::source::FrameStore;
use crate::types::{Rect, Size};

use super::input::InputTexture;

/// Color format of every shared surface and of the input texture it feeds.
pub const SHARED_SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Shared surface backed by a wgpu texture.
#[derive(Debug)]
pub struct GpuSurfaceMemory {
    id: u64,
    size: Size,
    texture: wgpu::Texture,
    use_count: AtomicI64,
}

impl GpuSurfaceMemory {
    pub fn use_count(&self) -> i64 {
        self.use_count.load(Ordering::Acquire)
    }
}

impl SurfaceMemory for GpuSurfaceMemory {
    fn id(&self) -> u64 {
        self.id
    }

    fn size(&self) -> Size {
        self.size
    }

    fn increment_use_count(&self) {
        self.use_count.fetch_add(1, Ordering::AcqRel);
    }

    fn decrement_use_count(&self) {
        let previous = self.use_count.fetch_sub(1, Ordering::AcqRel);
        if previous <= 0 {
            tracing::error!(surface = self.id, previous, "shared surface use count underflow");
        }
    }

    fn texture(&self) -> Option<&wgpu::Texture> {
        Some(&self.texture)
    }
}

#[derive(Debug, Clone)]
pub struct GpuSurfaceAllocator {
    device: wgpu::Device,
}

impl GpuSurfaceAllocator {
    pub fn new(device: wgpu::Device) -> Self {
        Self { device }
    }
}

impl SurfaceAllocator for GpuSurfaceAllocator {
    fn allocate(
        &mut self,
        size: Size,
        bytes_per_element: u32,
    ) -> Result<Arc<dyn SurfaceMemory>, BridgeError> {
        if size.is_empty() {
            return Err(BridgeError::Allocation {
                size,
                reason: "empty surface".to_string(),
            });
        }
        let texel = SHARED_SURFACE_FORMAT.block_copy_size(None).unwrap_or(4);
        if bytes_per_element != texel {
            return Err(BridgeError::Allocation {
                size,
                reason: format!("{bytes_per_element} bytes per element, surface uses {texel}"),
            });
        }
        let max = self.device.limits().max_texture_dimension_2d;
        if size.width > max || size.height > max {
            return Err(BridgeError::Allocation {
                size,
                reason: format!("GPU max texture dimension is {max}"),
            });
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shared legacy surface"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHARED_SURFACE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let id = NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(surface = id, width = size.width, height = size.height, "allocated shared surface");
        Ok(Arc::new(GpuSurfaceMemory {
            id,
            size,
            texture,
            use_count: AtomicI64::new(0),
        }))
    }
}

/// Copies the visible part of a shared surface into the input texture.
#[derive(Debug, Clone)]
pub struct GpuSurfaceCopier {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuSurfaceCopier {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }
}

impl SurfaceCopier for GpuSurfaceCopier {
    fn copy_to_input(
        &mut self,
        surface: &SharedSurface,
        region: Rect,
        store: &mut FrameStore,
    ) -> Result<(), BridgeError> {
        let source = surface
            .texture()
            .ok_or_else(|| BridgeError::Copy(format!("surface {} has no GPU texture", surface.id())))?;
        let (input, _) = InputTexture::ensure(
            store.input_slot(),
            &self.device,
            region.size(),
            SHARED_SURFACE_FORMAT,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("bridge copy encoder"),
            });
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: source,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: input.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
