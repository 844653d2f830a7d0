use crate::error::UploadError;
use crate::source::FrameStore;
use crate::types::Size;
use crate::upload::{StagedFrame, TexelEncoding, UploadRing};

/// Size and format the unified input texture is allocated with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputGeometry {
    pub size: Size,
    pub format: wgpu::TextureFormat,
}

impl InputGeometry {
    pub fn new(size: Size, format: wgpu::TextureFormat) -> Self {
        Self { size, format }
    }

    /// Whether a frame of this geometry needs a new texture, given the one
    /// currently allocated.
    pub fn needs_allocation(&self, current: Option<InputGeometry>) -> bool {
        current != Some(*self)
    }
}

/// The unified input texture every pipeline samples from.
///
/// It always holds exactly the visible frame, origin-cropped.
#[derive(Debug)]
pub struct InputTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: Size,
    format: wgpu::TextureFormat,
}

impl InputTexture {
    pub fn new(device: &wgpu::Device, size: Size, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("unified input texture"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
            format,
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn geometry(&self) -> InputGeometry {
        InputGeometry::new(self.size, self.format)
    }

    /// Reuses the texture in `slot` unless its size or format differ, in
    /// which case it is recreated. Returns whether a new texture was made.
    pub(crate) fn ensure<'a>(
        slot: &'a mut Option<InputTexture>,
        device: &wgpu::Device,
        size: Size,
        format: wgpu::TextureFormat,
    ) -> (&'a InputTexture, bool) {
        let wanted = InputGeometry::new(size, format);
        if wanted.needs_allocation(slot.as_ref().map(InputTexture::geometry)) {
            *slot = None;
        }
        let created = slot.is_none();
        let texture = slot.get_or_insert_with(|| {
            tracing::debug!(
                width = size.width,
                height = size.height,
                ?format,
                "recreating unified input texture"
            );
            InputTexture::new(device, size, format)
        });
        (texture, created)
    }
}

/// GPU half of the upload ring: one staging buffer per slot, filled from the
/// CPU slot and copied into the unified input texture.
#[derive(Debug)]
pub struct GpuUploader {
    ring: UploadRing,
    buffers: Vec<Option<wgpu::Buffer>>,
    next_frame: u64,
    textures_created: u64,
}

impl GpuUploader {
    pub fn new(depth: usize) -> Result<Self, UploadError> {
        let ring = UploadRing::new(depth)?;
        let buffers = (0..ring.depth()).map(|_| None).collect();
        Ok(Self {
            ring,
            buffers,
            next_frame: 0,
            textures_created: 0,
        })
    }

    pub fn ring(&self) -> &UploadRing {
        &self.ring
    }

    /// How many times the input texture had to be (re)allocated.
    pub fn textures_created(&self) -> u64 {
        self.textures_created
    }

    /// Stages the store's raw pixels and copies them into its input texture.
    ///
    /// Runs under the producer's content lock. The slot goes back to the
    /// ring as soon as the copy is submitted.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        store: &mut FrameStore,
    ) -> Result<StagedFrame, UploadError> {
        let (descriptor, pixels, input) = store.split_mut();
        let encoding = TexelEncoding::for_format(descriptor.resolved());
        let frame = self.next_frame;
        let staged = self.ring.stage(frame, descriptor, &encoding, pixels)?;
        self.next_frame += 1;

        let capacity = self.ring.capacity() as u64;
        let entry = &mut self.buffers[staged.slot];
        if entry.as_ref().is_some_and(|buffer| buffer.size() != capacity) {
            *entry = None;
        }
        let buffer: &wgpu::Buffer = entry.get_or_insert_with(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("upload slot"),
                size: capacity,
                usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });
        let bytes = &self.ring.slot_bytes(staged.slot)[..staged.layout.len()];
        queue.write_buffer(buffer, 0, bytes);

        let extent = staged.layout.extent;
        let (texture, created) =
            InputTexture::ensure(input, device, extent, encoding.texture_format);
        if created {
            self.textures_created += 1;
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("upload encoder"),
        });
        encoder.copy_buffer_to_texture(
            wgpu::TexelCopyBufferInfo {
                buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(staged.layout.bytes_per_row),
                    rows_per_image: Some(extent.height),
                },
            },
            wgpu::TexelCopyTextureInfo {
                texture: texture.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));
        self.ring.mark_issued(frame)?;

        tracing::trace!(
            frame,
            slot = staged.slot,
            strategy = ?staged.strategy,
            copies = staged.copy_calls,
            "uploaded frame"
        );
        Ok(staged)
    }
}
