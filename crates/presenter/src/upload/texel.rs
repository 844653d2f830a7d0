use crate::format::{GpuPixelFormat, ResolvedFormat};

/// Packed 16-bit layouts, named by GL component order from the high bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackedLayout {
    Rgb565,
    Rgba5551,
    Rgba4444,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conversion {
    /// Source texels are already in the texture layout.
    Copy,
    /// Keep the most significant byte of each little-endian component; any
    /// texture channel without a source component becomes opaque.
    Widen { components: u8, component_bytes: u8 },
    /// Expand a packed 16-bit texel to RGBA8.
    Unpack(PackedLayout),
}

/// How a resolved source format lands in the unified input texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TexelEncoding {
    pub texture_format: wgpu::TextureFormat,
    pub source_bytes: u32,
    pub texel_bytes: u32,
    pub conversion: Conversion,
}

impl TexelEncoding {
    pub fn for_format(resolved: ResolvedFormat) -> Self {
        use wgpu::TextureFormat as T;
        use GpuPixelFormat as F;

        let source_bytes = resolved.bytes_per_pixel.max(1);
        let (texture_format, texel_bytes) = match resolved.format {
            F::Bgra8Unorm => (T::Bgra8Unorm, 4),
            F::Rgba8Unorm | F::Rgb10a2Unorm | F::Rgba16Uint | F::Rgba32Uint => (T::Rgba8Unorm, 4),
            F::Rgba8Snorm => (T::Rgba8Snorm, 4),
            F::Rg8Unorm => (T::Rg8Unorm, 2),
            F::R8Unorm => (T::R8Unorm, 1),
            F::B5g6r5Unorm => return Self::unpacked(resolved, PackedLayout::Rgb565),
            F::A1bgr5Unorm => return Self::unpacked(resolved, PackedLayout::Rgba5551),
            F::Abgr4Unorm => return Self::unpacked(resolved, PackedLayout::Rgba4444),
        };

        let conversion = if source_bytes == texel_bytes {
            Conversion::Copy
        } else {
            widen(resolved)
        };

        Self {
            texture_format,
            source_bytes,
            texel_bytes,
            conversion,
        }
    }

    fn unpacked(resolved: ResolvedFormat, layout: PackedLayout) -> Self {
        let source_bytes = resolved.bytes_per_pixel.max(1);
        let conversion = if source_bytes == 2 {
            Conversion::Unpack(layout)
        } else {
            widen(resolved)
        };
        Self {
            texture_format: wgpu::TextureFormat::Rgba8Unorm,
            source_bytes,
            texel_bytes: 4,
            conversion,
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self.conversion, Conversion::Copy)
    }

    /// Converts one row of `src` texels into `dst`.
    ///
    /// Both slices must hold the same number of texels in their respective
    /// encodings; trailing partial texels are ignored.
    pub fn convert_row(&self, src: &[u8], dst: &mut [u8]) {
        match self.conversion {
            Conversion::Copy => {
                let len = src.len().min(dst.len());
                dst[..len].copy_from_slice(&src[..len]);
            }
            Conversion::Widen {
                components,
                component_bytes,
            } => {
                let components = usize::from(components);
                let width = usize::from(component_bytes);
                let src_texels = src.chunks_exact(self.source_bytes as usize);
                let dst_texels = dst.chunks_exact_mut(self.texel_bytes as usize);
                for (texel, out) in src_texels.zip(dst_texels) {
                    for (channel, value) in out.iter_mut().enumerate() {
                        *value = if channel < components {
                            texel[channel * width + width - 1]
                        } else {
                            u8::MAX
                        };
                    }
                }
            }
            Conversion::Unpack(layout) => {
                for (texel, out) in src.chunks_exact(2).zip(dst.chunks_exact_mut(4)) {
                    out.copy_from_slice(&unpack(layout, u16::from_le_bytes([texel[0], texel[1]])));
                }
            }
        }
    }
}

fn widen(resolved: ResolvedFormat) -> Conversion {
    Conversion::Widen {
        components: resolved.components.clamp(1, 4) as u8,
        component_bytes: resolved.component_bytes().clamp(1, 4) as u8,
    }
}

fn unpack(layout: PackedLayout, value: u16) -> [u8; 4] {
    let field = |shift: u16, bits: u16| (value >> shift) & ((1 << bits) - 1);
    match layout {
        PackedLayout::Rgb565 => [
            expand(field(11, 5), 5),
            expand(field(5, 6), 6),
            expand(field(0, 5), 5),
            u8::MAX,
        ],
        PackedLayout::Rgba5551 => [
            expand(field(11, 5), 5),
            expand(field(6, 5), 5),
            expand(field(1, 5), 5),
            if field(0, 1) == 1 { u8::MAX } else { 0 },
        ],
        PackedLayout::Rgba4444 => [
            expand(field(12, 4), 4),
            expand(field(8, 4), 4),
            expand(field(4, 4), 4),
            expand(field(0, 4), 4),
        ],
    }
}

/// Replicates the high bits so full-scale inputs map to 255.
fn expand(value: u16, bits: u16) -> u8 {
    let shifted = value << (8 - bits);
    (shifted | (shifted >> bits)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{gl, resolve};

    #[test]
    fn direct_formats_copy() {
        let encoding = TexelEncoding::for_format(resolve(gl::BGRA, gl::UNSIGNED_BYTE));
        assert_eq!(encoding.texture_format, wgpu::TextureFormat::Bgra8Unorm);
        assert!(encoding.is_copy());

        let encoding = TexelEncoding::for_format(resolve(gl::R8, gl::UNSIGNED_BYTE));
        assert_eq!(encoding.texture_format, wgpu::TextureFormat::R8Unorm);
        assert_eq!(encoding.texel_bytes, 1);
    }

    #[test]
    fn rgb8_gains_opaque_alpha() {
        let encoding = TexelEncoding::for_format(resolve(gl::RGB, gl::UNSIGNED_BYTE));
        assert_eq!(
            encoding.conversion,
            Conversion::Widen {
                components: 3,
                component_bytes: 1
            }
        );
        let mut out = [0u8; 8];
        encoding.convert_row(&[1, 2, 3, 4, 5, 6], &mut out);
        assert_eq!(out, [1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn wide_components_keep_high_byte() {
        let encoding = TexelEncoding::for_format(resolve(gl::RGB, gl::UNSIGNED_SHORT));
        assert_eq!(encoding.source_bytes, 6);
        let mut out = [0u8; 4];
        encoding.convert_row(&[0x00, 0xFF, 0x34, 0x12, 0xFF, 0x00], &mut out);
        assert_eq!(out, [0xFF, 0x12, 0x00, 0xFF]);
    }

    #[test]
    fn rgb_unsigned_int_reads_each_high_byte() {
        let encoding = TexelEncoding::for_format(resolve(gl::RGB, gl::UNSIGNED_INT));
        assert_eq!(encoding.source_bytes, 12);
        assert_eq!(
            encoding.conversion,
            Conversion::Widen {
                components: 3,
                component_bytes: 4
            }
        );
        let texel = [
            0x01, 0x02, 0x03, 0xAA, 0x04, 0x05, 0x06, 0xBB, 0x07, 0x08, 0x09, 0xCC,
        ];
        let mut out = [0u8; 4];
        encoding.convert_row(&texel, &mut out);
        assert_eq!(out, [0xAA, 0xBB, 0xCC, 0xFF]);
    }

    #[test]
    fn packed_formats_expand_to_full_range() {
        let rgb565 = TexelEncoding::for_format(resolve(gl::RGB, gl::UNSIGNED_SHORT_5_6_5));
        let mut out = [0u8; 8];
        // Pure red then pure green.
        rgb565.convert_row(&[0x00, 0xF8, 0xE0, 0x07], &mut out);
        assert_eq!(out, [255, 0, 0, 255, 0, 255, 0, 255]);

        let rgba5551 = TexelEncoding::for_format(resolve(gl::RGBA, gl::UNSIGNED_SHORT_5_5_5_1));
        let mut out = [0u8; 4];
        rgba5551.convert_row(&0x003Eu16.to_le_bytes(), &mut out);
        assert_eq!(out, [0, 0, 255, 0]);

        let rgba4444 = TexelEncoding::for_format(resolve(gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4));
        rgba4444.convert_row(&0xF00Fu16.to_le_bytes(), &mut out);
        assert_eq!(out, [255, 0, 0, 255]);
    }
}
