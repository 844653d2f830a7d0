//! Animated test card painted in whatever pixel format the producer uses.

use presenter::format::gl;
use presenter::FrameBufferDescriptor;

const BARS: [[u8; 3]; 8] = [
    [255, 255, 255],
    [255, 255, 0],
    [0, 255, 255],
    [0, 255, 0],
    [255, 0, 255],
    [255, 0, 0],
    [0, 0, 255],
    [16, 16, 16],
];

/// Colour of one pixel of the test card at `frame`.
///
/// Vertical colour bars fill the visible area with a bright column sweeping
/// across them and a one-pixel border marking the visible rectangle.
pub fn sample(descriptor: &FrameBufferDescriptor, x: u32, y: u32, frame: u64) -> [u8; 4] {
    let rect = descriptor.screen_rect();
    if x < rect.x || y < rect.y || x >= rect.x + rect.width || y >= rect.y + rect.height {
        // Outside the visible area; should never reach the screen.
        return [255, 0, 128, 255];
    }
    let (vx, vy) = (x - rect.x, y - rect.y);
    if vx == 0 || vy == 0 || vx + 1 == rect.width || vy + 1 == rect.height {
        return [255, 255, 255, 255];
    }
    let sweep = (frame % u64::from(rect.width)) as u32;
    if vx == sweep {
        return [255, 255, 255, 255];
    }
    let bar = (vx as usize * BARS.len()) / rect.width as usize;
    let [r, g, b] = BARS[bar.min(BARS.len() - 1)];
    let shade = 160 + (vy * 95 / rect.height.max(1)) as u16;
    let scale = |channel: u8| ((u16::from(channel) * shade) / 255) as u8;
    [scale(r), scale(g), scale(b), 255]
}

/// Paints the whole raw buffer, padding included.
pub fn paint(descriptor: &FrameBufferDescriptor, pixels: &mut [u8], frame: u64) {
    let bytes_per_pixel = descriptor.bytes_per_pixel() as usize;
    let stride = descriptor.source_row_bytes();
    let buffer = descriptor.buffer_size();
    for (y, row) in pixels.chunks_mut(stride).take(buffer.height as usize).enumerate() {
        for (x, texel) in row
            .chunks_exact_mut(bytes_per_pixel)
            .take(buffer.width as usize)
            .enumerate()
        {
            let rgba = sample(descriptor, x as u32, y as u32, frame);
            encode(descriptor.pixel_format(), descriptor.pixel_type(), rgba, texel);
        }
    }
}

/// Writes `rgba` into `out` using the legacy `(format, type)` layout.
pub fn encode(format: u32, ty: u32, rgba: [u8; 4], out: &mut [u8]) {
    let [r, g, b, a] = rgba.map(u16::from);
    let packed = match ty {
        gl::UNSIGNED_SHORT_5_6_5 => Some((r >> 3) << 11 | (g >> 2) << 5 | (b >> 3)),
        gl::UNSIGNED_SHORT_5_5_5_1 => Some((r >> 3) << 11 | (g >> 3) << 6 | (b >> 3) << 1 | (a >> 7)),
        gl::UNSIGNED_SHORT_4_4_4_4 => Some((r >> 4) << 12 | (g >> 4) << 8 | (b >> 4) << 4 | (a >> 4)),
        _ => None,
    };
    if let Some(value) = packed {
        for (dst, src) in out.iter_mut().zip(value.to_le_bytes()) {
            *dst = src;
        }
        return;
    }

    let channels: &[u8] = match format {
        gl::BGRA => &[rgba[2], rgba[1], rgba[0], rgba[3]],
        gl::RGB | gl::RGB8 => &rgba[..3],
        gl::RG8 | gl::LUMINANCE_ALPHA => &[rgba[0], rgba[3]],
        gl::R8 | gl::LUMINANCE => &rgba[..1],
        gl::ALPHA => &rgba[3..],
        _ => &rgba,
    };
    let width = (out.len() / channels.len()).max(1);
    for (component, &value) in out.chunks_mut(width).zip(channels) {
        // Every byte of a wide component carries the value, so readers that
        // keep only the most significant byte still see it.
        component.fill(if ty == gl::BYTE { value / 2 } else { value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presenter::{Rect, Size};

    fn descriptor(format: u32, ty: u32) -> FrameBufferDescriptor {
        FrameBufferDescriptor::new(Size::new(20, 10), Rect::new(2, 1, 16, 8), format, ty).unwrap()
    }

    #[test]
    fn border_marks_visible_rect() {
        let desc = descriptor(gl::RGBA, gl::UNSIGNED_BYTE);
        assert_eq!(sample(&desc, 2, 1, 5), [255, 255, 255, 255]);
        assert_eq!(sample(&desc, 0, 0, 5), [255, 0, 128, 255]);
        assert_eq!(sample(&desc, 17, 8, 5), [255, 255, 255, 255]);
    }

    #[test]
    fn packs_sixteen_bit_layouts() {
        let mut out = [0u8; 2];
        encode(gl::RGB, gl::UNSIGNED_SHORT_5_6_5, [255, 0, 0, 255], &mut out);
        assert_eq!(u16::from_le_bytes(out), 0xF800);
        encode(gl::RGBA, gl::UNSIGNED_SHORT_5_5_5_1, [0, 0, 255, 255], &mut out);
        assert_eq!(u16::from_le_bytes(out), 0x003F);
        encode(gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4, [0, 255, 0, 0], &mut out);
        assert_eq!(u16::from_le_bytes(out), 0x0F00);
    }

    #[test]
    fn orders_byte_components() {
        let mut out = [0u8; 4];
        encode(gl::BGRA, gl::UNSIGNED_BYTE, [1, 2, 3, 4], &mut out);
        assert_eq!(out, [3, 2, 1, 4]);

        let mut wide = [0u8; 6];
        encode(gl::RGB, gl::UNSIGNED_SHORT, [1, 2, 3, 4], &mut wide);
        assert_eq!(wide, [1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn paints_every_visible_texel() {
        let desc = descriptor(gl::BGRA, gl::UNSIGNED_BYTE);
        let mut pixels = vec![0u8; desc.source_len()];
        paint(&desc, &mut pixels, 3);
        let stride = desc.source_row_bytes();
        let first_visible = stride + 2 * 4;
        assert_eq!(&pixels[first_visible..first_visible + 4], &[255, 255, 255, 255]);
        assert!(pixels.chunks_exact(4).all(|texel| texel[3] == 255));
    }
}
