use crate::error::DescriptorError;
use crate::format::{self, ResolvedFormat};
use crate::types::{Rect, Size};

/// Largest buffer edge accepted, matching the widest texture a GPU is
/// expected to allocate.
pub const MAX_DIMENSION: u32 = 16384;

/// Geometry and pixel layout of a producer's raw frame buffer.
///
/// Built in one step and replaced wholesale whenever the producer changes its
/// output; there is no way to patch a single field, so readers never observe
/// a visible rectangle that belongs to a different buffer size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameBufferDescriptor {
    buffer_size: Size,
    screen_rect: Rect,
    pixel_format: u32,
    pixel_type: u32,
    resolved: ResolvedFormat,
    aspect: Size,
}

impl FrameBufferDescriptor {
    /// Validates `screen_rect ⊆ buffer_size` and resolves the pixel layout.
    ///
    /// The display aspect defaults to the visible rectangle; producers with
    /// non-square pixels override it with [`Self::with_aspect`].
    pub fn new(
        buffer_size: Size,
        screen_rect: Rect,
        pixel_format: u32,
        pixel_type: u32,
    ) -> Result<Self, DescriptorError> {
        if buffer_size.is_empty() {
            return Err(DescriptorError::EmptyBuffer { size: buffer_size });
        }
        if buffer_size.width > MAX_DIMENSION || buffer_size.height > MAX_DIMENSION {
            return Err(DescriptorError::TooLarge {
                size: buffer_size,
                max: MAX_DIMENSION,
            });
        }
        if screen_rect.size().is_empty() {
            return Err(DescriptorError::EmptyScreenRect { rect: screen_rect });
        }
        if !screen_rect.fits_within(buffer_size) {
            return Err(DescriptorError::ScreenRectOutOfBounds {
                rect: screen_rect,
                buffer: buffer_size,
            });
        }

        Ok(Self {
            buffer_size,
            screen_rect,
            pixel_format,
            pixel_type,
            resolved: format::resolve(pixel_format, pixel_type),
            aspect: screen_rect.size(),
        })
    }

    /// Replaces the display aspect ratio; an empty size restores the default.
    pub fn with_aspect(mut self, aspect: Size) -> Self {
        self.aspect = if aspect.is_empty() {
            self.screen_rect.size()
        } else {
            aspect
        };
        self
    }

    pub fn buffer_size(&self) -> Size {
        self.buffer_size
    }

    pub fn screen_rect(&self) -> Rect {
        self.screen_rect
    }

    pub fn pixel_format(&self) -> u32 {
        self.pixel_format
    }

    pub fn pixel_type(&self) -> u32 {
        self.pixel_type
    }

    pub fn resolved(&self) -> ResolvedFormat {
        self.resolved
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        self.resolved.bytes_per_pixel
    }

    pub fn aspect(&self) -> Size {
        self.aspect
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect.width as f32 / self.aspect.height.max(1) as f32
    }

    /// Stride of one full source row.
    pub fn source_row_bytes(&self) -> usize {
        self.buffer_size.width as usize * self.bytes_per_pixel() as usize
    }

    /// Tight stride of one cropped row.
    pub fn visible_row_bytes(&self) -> usize {
        self.screen_rect.width as usize * self.bytes_per_pixel() as usize
    }

    /// Bytes a producer must supply for one complete frame.
    pub fn source_len(&self) -> usize {
        self.source_row_bytes() * self.buffer_size.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{gl, GpuPixelFormat};

    #[test]
    fn accepts_offset_visible_rect() {
        let descriptor = FrameBufferDescriptor::new(
            Size::new(292, 224),
            Rect::new(8, 8, 256, 208),
            gl::BGRA,
            gl::UNSIGNED_BYTE,
        )
        .unwrap();

        assert_eq!(descriptor.resolved().format, GpuPixelFormat::Bgra8Unorm);
        assert_eq!(descriptor.source_row_bytes(), 292 * 4);
        assert_eq!(descriptor.visible_row_bytes(), 256 * 4);
        assert_eq!(descriptor.source_len(), 292 * 4 * 224);
    }

    #[test]
    fn rejects_rect_outside_buffer() {
        let err = FrameBufferDescriptor::new(
            Size::new(256, 224),
            Rect::new(8, 0, 256, 224),
            gl::RGBA,
            gl::UNSIGNED_BYTE,
        )
        .unwrap_err();
        assert!(matches!(err, DescriptorError::ScreenRectOutOfBounds { .. }));
    }

    #[test]
    fn rejects_empty_geometry() {
        let empty_buffer = FrameBufferDescriptor::new(
            Size::new(0, 224),
            Rect::new(0, 0, 0, 0),
            gl::RGBA,
            gl::UNSIGNED_BYTE,
        );
        assert!(matches!(
            empty_buffer,
            Err(DescriptorError::EmptyBuffer { .. })
        ));

        let empty_rect = FrameBufferDescriptor::new(
            Size::new(256, 224),
            Rect::new(0, 0, 256, 0),
            gl::RGBA,
            gl::UNSIGNED_BYTE,
        );
        assert!(matches!(
            empty_rect,
            Err(DescriptorError::EmptyScreenRect { .. })
        ));
    }

    #[test]
    fn rejects_oversized_buffer() {
        let err = FrameBufferDescriptor::new(
            Size::new(u32::MAX, 2),
            Rect::new(0, 0, 16, 2),
            gl::RGBA,
            gl::UNSIGNED_INT,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DescriptorError::TooLarge {
                size: Size::new(u32::MAX, 2),
                max: MAX_DIMENSION
            }
        );
        assert!(FrameBufferDescriptor::new(
            Size::new(MAX_DIMENSION, 1),
            Rect::new(0, 0, MAX_DIMENSION, 1),
            gl::RGBA,
            gl::UNSIGNED_BYTE,
        )
        .is_ok());
    }

    #[test]
    fn aspect_defaults_to_visible_rect() {
        let descriptor = FrameBufferDescriptor::new(
            Size::new(256, 224),
            Rect::new(0, 0, 256, 224),
            gl::RGBA,
            gl::UNSIGNED_BYTE,
        )
        .unwrap();
        assert_eq!(descriptor.aspect(), Size::new(256, 224));

        let widened = descriptor.with_aspect(Size::new(4, 3));
        assert!((widened.aspect_ratio() - 4.0 / 3.0).abs() < f32::EPSILON);
        assert_eq!(widened.with_aspect(Size::default()).aspect(), Size::new(256, 224));
    }
}
