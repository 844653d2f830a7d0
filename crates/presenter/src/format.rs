//! Legacy pixel format negotiation.
//!
//! Producers describe their buffers with fixed-function GL enumerators
//! (`format`, `type`). [`resolve`] turns that pair into the texture format the
//! presenter allocates and the byte width used for every upload size
//! calculation. Resolution never fails: an unknown pair is logged and mapped
//! to [`ResolvedFormat::FALLBACK`].

pub mod gl {
    //! GL enumerator values understood by the resolver.

    pub const BYTE: u32 = 0x1400;
    pub const UNSIGNED_BYTE: u32 = 0x1401;
    pub const SHORT: u32 = 0x1402;
    pub const UNSIGNED_SHORT: u32 = 0x1403;
    pub const INT: u32 = 0x1404;
    pub const UNSIGNED_INT: u32 = 0x1405;
    pub const FLOAT: u32 = 0x1406;
    pub const UNSIGNED_SHORT_4_4_4_4: u32 = 0x8033;
    pub const UNSIGNED_SHORT_5_5_5_1: u32 = 0x8034;
    pub const UNSIGNED_SHORT_5_6_5: u32 = 0x8363;
    pub const UNSIGNED_INT_8_8_8_8_REV: u32 = 0x8367;
    pub const UNSIGNED_SHORT_8_8_APPLE: u32 = 0x85BA;
    pub const FLOAT_32_UNSIGNED_INT_24_8_REV: u32 = 0x8DAD;

    pub const ALPHA: u32 = 0x1906;
    pub const RGB: u32 = 0x1907;
    pub const RGBA: u32 = 0x1908;
    pub const LUMINANCE: u32 = 0x1909;
    pub const LUMINANCE_ALPHA: u32 = 0x190A;
    pub const BGRA: u32 = 0x80E1;
    pub const RGB8: u32 = 0x8051;
    pub const RGB5_A1: u32 = 0x8057;
    pub const RGBA8: u32 = 0x8058;
    pub const R8: u32 = 0x8229;
    pub const RG8: u32 = 0x822B;
    pub const RGB565: u32 = 0x8D62;

    pub const DEPTH_COMPONENT16: u32 = 0x81A5;
    pub const DEPTH_COMPONENT24: u32 = 0x81A6;
}

/// Texture formats a legacy buffer can be negotiated to.
///
/// This mirrors what the producer's data actually looks like on the GPU side,
/// including packed 16-bit layouts that wgpu cannot sample directly; those
/// are widened while staging (see `upload::texel`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GpuPixelFormat {
    Bgra8Unorm,
    Rgba8Unorm,
    Rgba8Snorm,
    Rgb10a2Unorm,
    B5g6r5Unorm,
    A1bgr5Unorm,
    Abgr4Unorm,
    Rg8Unorm,
    R8Unorm,
    Rgba16Uint,
    Rgba32Uint,
}

impl GpuPixelFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bgra8Unorm => "bgra8unorm",
            Self::Rgba8Unorm => "rgba8unorm",
            Self::Rgba8Snorm => "rgba8snorm",
            Self::Rgb10a2Unorm => "rgb10a2unorm",
            Self::B5g6r5Unorm => "b5g6r5unorm",
            Self::A1bgr5Unorm => "a1bgr5unorm",
            Self::Abgr4Unorm => "abgr4unorm",
            Self::Rg8Unorm => "rg8unorm",
            Self::R8Unorm => "r8unorm",
            Self::Rgba16Uint => "rgba16uint",
            Self::Rgba32Uint => "rgba32uint",
        }
    }
}

/// Output of [`resolve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedFormat {
    pub format: GpuPixelFormat,
    /// Authoritative source byte width per pixel.
    pub bytes_per_pixel: u32,
    /// Source components per pixel; a packed type counts as one.
    pub components: u32,
}

impl ResolvedFormat {
    pub const FALLBACK: Self = Self {
        format: GpuPixelFormat::Rgba8Unorm,
        bytes_per_pixel: 4,
        components: 4,
    };

    /// Byte width of one source component.
    pub fn component_bytes(&self) -> u32 {
        self.bytes_per_pixel / self.components.max(1)
    }
}

/// Maps a legacy `(format, type)` pair to a texture format and byte width.
pub fn resolve(format: u32, ty: u32) -> ResolvedFormat {
    let layout = pixel_layout(format, ty);
    match (documented_format(format, ty), layout) {
        (Some(gpu), Some((components, component_bytes))) => ResolvedFormat {
            format: gpu,
            bytes_per_pixel: components * component_bytes,
            components,
        },
        (gpu, layout) => {
            let bytes = layout.map(|(components, width)| components * width);
            tracing::warn!(
                format = format_args!("{format:#06x}"),
                ty = format_args!("{ty:#06x}"),
                mapped = ?gpu,
                bytes_per_pixel = ?bytes,
                "unknown legacy pixel format; defaulting to rgba8unorm"
            );
            ResolvedFormat::FALLBACK
        }
    }
}

/// Exact pairs with a known modern counterpart, then type-only packed
/// overrides, then format-only matches.
fn documented_format(format: u32, ty: u32) -> Option<GpuPixelFormat> {
    use GpuPixelFormat as F;

    let mapped = match (format, ty) {
        (gl::BGRA, gl::UNSIGNED_BYTE | gl::UNSIGNED_INT_8_8_8_8_REV | gl::UNSIGNED_INT) => {
            F::Bgra8Unorm
        }
        (gl::RGBA | gl::RGBA8, gl::UNSIGNED_BYTE) => F::Rgba8Unorm,
        (gl::RGBA, gl::BYTE) => F::Rgba8Snorm,
        // No three-component 8-bit texture; alpha is filled while staging.
        (gl::RGB | gl::RGB8, gl::UNSIGNED_BYTE) => F::Rgba8Unorm,
        (gl::RGB, gl::UNSIGNED_SHORT) => F::Rgb10a2Unorm,
        (gl::RGB | gl::BGRA, gl::UNSIGNED_SHORT_5_6_5) => F::B5g6r5Unorm,
        (gl::RGB, gl::UNSIGNED_INT) => F::Rgba32Uint,
        (_, gl::UNSIGNED_SHORT_8_8_APPLE) => F::Rg8Unorm,
        (_, gl::UNSIGNED_SHORT_5_5_5_1) => F::A1bgr5Unorm,
        (_, gl::UNSIGNED_SHORT_4_4_4_4) => F::Abgr4Unorm,
        (gl::RGBA8, gl::UNSIGNED_SHORT) => F::Rgba16Uint,
        (gl::RGBA8, gl::UNSIGNED_INT) => F::Rgba32Uint,
        (gl::R8, _) => F::R8Unorm,
        (gl::RG8, _) => F::Rg8Unorm,
        (gl::RGB565, _) => F::B5g6r5Unorm,
        (gl::LUMINANCE | gl::ALPHA, gl::UNSIGNED_BYTE) => F::R8Unorm,
        (gl::LUMINANCE_ALPHA, gl::UNSIGNED_BYTE) => F::Rg8Unorm,
        _ => return None,
    };
    Some(mapped)
}

/// Byte width of one pixel, computed from `(format, type)` alone.
///
/// Returns `None` when either enumerator is unknown.
pub fn bytes_per_pixel(format: u32, ty: u32) -> Option<u32> {
    pixel_layout(format, ty).map(|(components, component_bytes)| components * component_bytes)
}

/// `(components, bytes per component)` of one source pixel.
fn pixel_layout(format: u32, ty: u32) -> Option<(u32, u32)> {
    let component_bytes = match ty {
        gl::BYTE | gl::UNSIGNED_BYTE => 1,
        gl::SHORT | gl::UNSIGNED_SHORT => 2,
        gl::INT | gl::UNSIGNED_INT | gl::FLOAT | gl::FLOAT_32_UNSIGNED_INT_24_8_REV => 4,
        gl::UNSIGNED_INT_8_8_8_8_REV => return Some((4, 1)),
        gl::UNSIGNED_SHORT_5_6_5
        | gl::UNSIGNED_SHORT_4_4_4_4
        | gl::UNSIGNED_SHORT_5_5_5_1
        | gl::UNSIGNED_SHORT_8_8_APPLE => return Some((1, 2)),
        _ => return None,
    };

    match format {
        gl::RGBA8 => return Some((4, 1)),
        gl::RGB8 => return Some((3, 1)),
        gl::RGB5_A1 => return Some((1, 2)),
        _ => {}
    }

    let components = match format {
        gl::RGBA | gl::BGRA => 4,
        gl::RGB | gl::RGB565 => 3,
        gl::LUMINANCE_ALPHA | gl::RG8 => 2,
        gl::LUMINANCE | gl::ALPHA | gl::R8 => 1,
        _ => return None,
    };
    Some((components, component_bytes))
}

/// Depth attachment format for a legacy depth internal format.
pub fn resolve_depth(internal_format: u32) -> wgpu::TextureFormat {
    match internal_format {
        gl::DEPTH_COMPONENT16 => wgpu::TextureFormat::Depth16Unorm,
        gl::DEPTH_COMPONENT24 => wgpu::TextureFormat::Depth24PlusStencil8,
        other => {
            tracing::warn!(
                internal_format = format_args!("{other:#06x}"),
                "unknown depth format; defaulting to depth16unorm"
            );
            wgpu::TextureFormat::Depth16Unorm
        }
    }
}

/// Named `(format, type)` pairs accepted by front ends and listed by tools.
pub const NAMED_FORMATS: &[(&str, u32, u32)] = &[
    ("bgra8", gl::BGRA, gl::UNSIGNED_BYTE),
    ("bgra8-rev", gl::BGRA, gl::UNSIGNED_INT_8_8_8_8_REV),
    ("rgba8", gl::RGBA, gl::UNSIGNED_BYTE),
    ("rgba8-snorm", gl::RGBA, gl::BYTE),
    ("rgb8", gl::RGB, gl::UNSIGNED_BYTE),
    ("rgb16", gl::RGB, gl::UNSIGNED_SHORT),
    ("rgb565", gl::RGB, gl::UNSIGNED_SHORT_5_6_5),
    ("rgba5551", gl::RGBA, gl::UNSIGNED_SHORT_5_5_5_1),
    ("rgba4444", gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4),
    ("rgba16", gl::RGBA8, gl::UNSIGNED_SHORT),
    ("rgba32", gl::RGBA8, gl::UNSIGNED_INT),
    ("rg8", gl::RG8, gl::UNSIGNED_BYTE),
    ("r8", gl::R8, gl::UNSIGNED_BYTE),
    ("luminance", gl::LUMINANCE, gl::UNSIGNED_BYTE),
];

pub fn named_format(name: &str) -> Option<(u32, u32)> {
    let needle = name.trim().to_ascii_lowercase();
    NAMED_FORMATS
        .iter()
        .find(|(candidate, _, _)| *candidate == needle)
        .map(|&(_, format, ty)| (format, ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(format: GpuPixelFormat, bytes_per_pixel: u32) -> (GpuPixelFormat, u32) {
        (format, bytes_per_pixel)
    }

    #[test]
    fn documented_pairs_resolve_deterministically() {
        use GpuPixelFormat as F;
        let table = [
            (gl::BGRA, gl::UNSIGNED_BYTE, pair(F::Bgra8Unorm, 4)),
            (gl::BGRA, gl::UNSIGNED_INT_8_8_8_8_REV, pair(F::Bgra8Unorm, 4)),
            (gl::BGRA, gl::UNSIGNED_INT, pair(F::Bgra8Unorm, 16)),
            (gl::RGBA, gl::UNSIGNED_BYTE, pair(F::Rgba8Unorm, 4)),
            (gl::RGBA8, gl::UNSIGNED_BYTE, pair(F::Rgba8Unorm, 4)),
            (gl::RGBA, gl::BYTE, pair(F::Rgba8Snorm, 4)),
            (gl::RGB, gl::UNSIGNED_BYTE, pair(F::Rgba8Unorm, 3)),
            (gl::RGB8, gl::UNSIGNED_BYTE, pair(F::Rgba8Unorm, 3)),
            (gl::RGB, gl::UNSIGNED_SHORT, pair(F::Rgb10a2Unorm, 6)),
            (gl::RGB, gl::UNSIGNED_SHORT_5_6_5, pair(F::B5g6r5Unorm, 2)),
            (gl::BGRA, gl::UNSIGNED_SHORT_5_6_5, pair(F::B5g6r5Unorm, 2)),
            (gl::RGB, gl::UNSIGNED_INT, pair(F::Rgba32Uint, 12)),
            (gl::RGBA, gl::UNSIGNED_SHORT_5_5_5_1, pair(F::A1bgr5Unorm, 2)),
            (gl::RGB5_A1, gl::UNSIGNED_SHORT_5_5_5_1, pair(F::A1bgr5Unorm, 2)),
            (gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4, pair(F::Abgr4Unorm, 2)),
            (gl::RGBA8, gl::UNSIGNED_SHORT, pair(F::Rgba16Uint, 4)),
            (gl::RGBA8, gl::UNSIGNED_INT, pair(F::Rgba32Uint, 4)),
            (gl::R8, gl::UNSIGNED_BYTE, pair(F::R8Unorm, 1)),
            (gl::RG8, gl::UNSIGNED_BYTE, pair(F::Rg8Unorm, 2)),
            (gl::RGB565, gl::UNSIGNED_SHORT_5_6_5, pair(F::B5g6r5Unorm, 2)),
            (gl::LUMINANCE, gl::UNSIGNED_BYTE, pair(F::R8Unorm, 1)),
            (gl::LUMINANCE_ALPHA, gl::UNSIGNED_BYTE, pair(F::Rg8Unorm, 2)),
        ];

        for (format, ty, expected) in table {
            let resolved = resolve(format, ty);
            assert_eq!(
                (resolved.format, resolved.bytes_per_pixel),
                expected,
                "{format:#x}/{ty:#x}"
            );
            assert_eq!(resolve(format, ty), resolve(format, ty));
        }
    }

    #[test]
    fn packed_types_override_format_width() {
        for format in [gl::RGBA, gl::RGB, gl::BGRA, gl::RGBA8, gl::RGB8] {
            assert_eq!(bytes_per_pixel(format, gl::UNSIGNED_SHORT_5_6_5), Some(2));
            assert_eq!(bytes_per_pixel(format, gl::UNSIGNED_SHORT_4_4_4_4), Some(2));
            assert_eq!(bytes_per_pixel(format, gl::UNSIGNED_SHORT_5_5_5_1), Some(2));
        }
    }

    #[test]
    fn component_fallback_multiplies_width() {
        assert_eq!(bytes_per_pixel(gl::RGB, gl::FLOAT), Some(12));
        assert_eq!(bytes_per_pixel(gl::LUMINANCE_ALPHA, gl::SHORT), Some(4));
        assert_eq!(bytes_per_pixel(gl::ALPHA, gl::UNSIGNED_BYTE), Some(1));
    }

    #[test]
    fn component_layout_follows_format_and_type() {
        let rgb32 = resolve(gl::RGB, gl::UNSIGNED_INT);
        assert_eq!((rgb32.components, rgb32.component_bytes()), (3, 4));

        let bgra32 = resolve(gl::BGRA, gl::UNSIGNED_INT);
        assert_eq!((bgra32.components, bgra32.component_bytes()), (4, 4));

        let rgb565 = resolve(gl::RGB, gl::UNSIGNED_SHORT_5_6_5);
        assert_eq!((rgb565.components, rgb565.component_bytes()), (1, 2));

        let rgb8 = resolve(gl::RGB8, gl::UNSIGNED_BYTE);
        assert_eq!((rgb8.components, rgb8.component_bytes()), (3, 1));
    }

    #[test]
    fn unknown_pairs_degrade_to_rgba8() {
        assert_eq!(resolve(0xDEAD, gl::UNSIGNED_BYTE), ResolvedFormat::FALLBACK);
        assert_eq!(resolve(gl::RGBA, 0xBEEF), ResolvedFormat::FALLBACK);
        // Byte width known, but no documented texture format.
        assert_eq!(resolve(gl::RGB, gl::FLOAT), ResolvedFormat::FALLBACK);
        assert_eq!(bytes_per_pixel(gl::RGBA, 0xBEEF), None);
    }

    #[test]
    fn depth_formats_map_and_default() {
        assert_eq!(
            resolve_depth(gl::DEPTH_COMPONENT16),
            wgpu::TextureFormat::Depth16Unorm
        );
        assert_eq!(
            resolve_depth(gl::DEPTH_COMPONENT24),
            wgpu::TextureFormat::Depth24PlusStencil8
        );
        assert_eq!(resolve_depth(0), wgpu::TextureFormat::Depth16Unorm);
    }

    #[test]
    fn named_formats_are_all_documented() {
        for (name, format, ty) in NAMED_FORMATS {
            assert!(documented_format(*format, *ty).is_some(), "{name}");
            assert!(bytes_per_pixel(*format, *ty).is_some(), "{name}");
        }
        assert_eq!(named_format(" RGB565 "), Some((gl::RGB, gl::UNSIGNED_SHORT_5_6_5)));
        assert_eq!(named_format("yuv"), None);
    }
}
