//! Software stand-in for a legacy immediate-mode context.
//!
//! Names and attachments are tracked the way a real context would; a flush
//! rasterises the test card into the bound colour texture with
//! `Queue::write_texture`, bottom-up like a legacy framebuffer.

use std::collections::HashMap;
use std::num::NonZeroU32;

use presenter::bridge::GlName;
use presenter::format::{gl, resolve_depth};
use presenter::{BridgeError, FrameBufferDescriptor, GraphicsContext, Rect, SharedSurface, Size};

use crate::pattern;

pub struct SoftwareContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    descriptor: FrameBufferDescriptor,
    next_name: u32,
    textures: HashMap<GlName, wgpu::Texture>,
    renderbuffers: HashMap<GlName, wgpu::Texture>,
    framebuffers: HashMap<GlName, Option<GlName>>,
    bound: Option<GlName>,
    viewport: Rect,
    frame: u64,
    scratch: Vec<u8>,
}

impl SoftwareContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, descriptor: FrameBufferDescriptor) -> Self {
        Self {
            device,
            queue,
            descriptor,
            next_name: 0,
            textures: HashMap::new(),
            renderbuffers: HashMap::new(),
            framebuffers: HashMap::new(),
            bound: None,
            viewport: descriptor.screen_rect(),
            frame: 0,
            scratch: Vec::new(),
        }
    }

    /// Frame number the next flush paints.
    pub fn set_frame(&mut self, frame: u64) {
        self.frame = frame;
    }

    pub fn live_objects(&self) -> usize {
        self.textures.len() + self.renderbuffers.len() + self.framebuffers.len()
    }

    fn allocate_name(&mut self) -> Result<GlName, BridgeError> {
        self.next_name = self
            .next_name
            .checked_add(1)
            .ok_or_else(|| BridgeError::Context("object names exhausted".into()))?;
        NonZeroU32::new(self.next_name)
            .map(GlName)
            .ok_or_else(|| BridgeError::Context("object names exhausted".into()))
    }

    fn bound_color(&self) -> Option<&wgpu::Texture> {
        let framebuffer = self.bound?;
        let color = (*self.framebuffers.get(&framebuffer)?)?;
        self.textures.get(&color)
    }

    fn rasterise(&mut self) {
        let rect = self.viewport;
        if rect.size().is_empty() {
            return;
        }
        let row_bytes = rect.width as usize * 4;
        self.scratch.resize(row_bytes * rect.height as usize, 0);
        for (row, out) in self.scratch.chunks_exact_mut(row_bytes).enumerate() {
            // Row zero is the bottom of the picture.
            let y = rect.y + rect.height - 1 - row as u32;
            for (column, texel) in out.chunks_exact_mut(4).enumerate() {
                let rgba = pattern::sample(&self.descriptor, rect.x + column as u32, y, self.frame);
                pattern::encode(gl::BGRA, gl::UNSIGNED_BYTE, rgba, texel);
            }
        }
    }
}

impl GraphicsContext for SoftwareContext {
    fn create_framebuffer(&mut self) -> Result<GlName, BridgeError> {
        let name = self.allocate_name()?;
        self.framebuffers.insert(name, None);
        Ok(name)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<GlName>) {
        self.bound = framebuffer;
    }

    fn create_surface_texture(&mut self, surface: &SharedSurface) -> Result<GlName, BridgeError> {
        let texture = surface
            .texture()
            .cloned()
            .ok_or_else(|| BridgeError::Context(format!("surface {} has no texture", surface.id())))?;
        let name = self.allocate_name()?;
        self.textures.insert(name, texture);
        Ok(name)
    }

    fn attach_color_texture(&mut self, framebuffer: GlName, texture: GlName) {
        if let Some(slot) = self.framebuffers.get_mut(&framebuffer) {
            *slot = Some(texture);
        }
    }

    fn create_depth_renderbuffer(
        &mut self,
        size: Size,
        internal_format: u32,
    ) -> Result<GlName, BridgeError> {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("legacy depth renderbuffer"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: resolve_depth(internal_format),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let name = self.allocate_name()?;
        self.renderbuffers.insert(name, texture);
        Ok(name)
    }

    fn attach_depth_renderbuffer(&mut self, _framebuffer: GlName, _renderbuffer: GlName) {}

    fn framebuffer_complete(&mut self, framebuffer: GlName) -> bool {
        matches!(self.framebuffers.get(&framebuffer), Some(Some(_)))
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.viewport = rect;
    }

    fn flush(&mut self) {
        if self.bound_color().is_none() {
            tracing::warn!("flush without a bound colour attachment");
            return;
        }
        self.rasterise();
        let rect = self.viewport;
        let Some(texture) = self.bound_color() else {
            return;
        };
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: rect.x,
                    y: rect.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &self.scratch,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(rect.width * 4),
                rows_per_image: Some(rect.height),
            },
            wgpu::Extent3d {
                width: rect.width,
                height: rect.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn delete_framebuffer(&mut self, framebuffer: GlName) {
        if self.bound == Some(framebuffer) {
            self.bound = None;
        }
        self.framebuffers.remove(&framebuffer);
    }

    fn delete_texture(&mut self, texture: GlName) {
        self.textures.remove(&texture);
    }

    fn delete_renderbuffer(&mut self, renderbuffer: GlName) {
        if let Some(texture) = self.renderbuffers.remove(&renderbuffer) {
            texture.destroy();
        }
    }
}
