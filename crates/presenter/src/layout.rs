use crate::types::{Rect, Size};

/// Frame rates below this are treated as a malformed producer interval.
pub const MIN_FRAMES_PER_SECOND: f32 = 10.0;
pub const DEFAULT_FRAMES_PER_SECOND: f32 = 60.0;

/// Places the emulated frame inside the drawable.
///
/// The frame keeps `aspect` (width over height). With `integer_scale` the
/// visible size is multiplied by the largest whole factor that fits, which
/// keeps every emulated pixel the same size on screen; when not even a 1x
/// copy fits this falls back to the plain aspect fit.
pub fn fit_viewport(aspect: f32, visible: Size, drawable: Size, integer_scale: bool) -> Rect {
    if drawable.is_empty() {
        return Rect::default();
    }
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else if !visible.is_empty() {
        visible.width as f32 / visible.height as f32
    } else {
        1.0
    };

    if integer_scale && !visible.is_empty() {
        // Integer scaling honours the aspect by stretching the visible width.
        let base_width = (visible.height as f32 * aspect).round().max(1.0) as u32;
        let factor = (drawable.width / base_width).min(drawable.height / visible.height);
        if factor >= 1 {
            return centered(
                Size::new(base_width * factor, visible.height * factor),
                drawable,
            );
        }
    }

    let drawable_aspect = drawable.width as f32 / drawable.height as f32;
    let size = if drawable_aspect > aspect {
        let width = (drawable.height as f32 * aspect).round() as u32;
        Size::new(width.clamp(1, drawable.width), drawable.height)
    } else {
        let height = (drawable.width as f32 / aspect).round() as u32;
        Size::new(drawable.width, height.clamp(1, drawable.height))
    };
    centered(size, drawable)
}

fn centered(size: Size, drawable: Size) -> Rect {
    Rect::new(
        (drawable.width - size.width) / 2,
        (drawable.height - size.height) / 2,
        size.width,
        size.height,
    )
}

/// Display rate requested for a producer's declared frame interval.
pub fn preferred_frames_per_second(interval: f32) -> f32 {
    if interval.is_finite() && interval >= MIN_FRAMES_PER_SECOND {
        return interval;
    }
    tracing::warn!(
        interval,
        fallback = DEFAULT_FRAMES_PER_SECOND,
        "producer frame interval out of range"
    );
    DEFAULT_FRAMES_PER_SECOND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letterboxes_wide_drawables() {
        let rect = fit_viewport(4.0 / 3.0, Size::new(256, 224), Size::new(1920, 1080), false);
        assert_eq!(rect, Rect::new(240, 0, 1440, 1080));
    }

    #[test]
    fn pillarboxes_tall_drawables() {
        let rect = fit_viewport(4.0 / 3.0, Size::new(256, 224), Size::new(800, 1200), false);
        assert_eq!(rect, Rect::new(0, 300, 800, 600));
    }

    #[test]
    fn integer_scale_snaps_to_whole_multiples() {
        let rect = fit_viewport(160.0 / 144.0, Size::new(160, 144), Size::new(1000, 700), true);
        assert_eq!(rect, Rect::new(180, 62, 640, 576));
        assert_eq!(rect.width % 160, 0);
        assert_eq!(rect.height % 144, 0);
    }

    #[test]
    fn integer_scale_falls_back_when_too_small() {
        let fitted = fit_viewport(4.0 / 3.0, Size::new(320, 240), Size::new(200, 150), true);
        assert_eq!(fitted, Rect::new(0, 0, 200, 150));
    }

    #[test]
    fn empty_drawable_yields_empty_viewport() {
        let rect = fit_viewport(1.0, Size::new(16, 16), Size::new(0, 480), false);
        assert_eq!(rect, Rect::default());
    }

    #[test]
    fn malformed_intervals_default_to_sixty() {
        assert_eq!(preferred_frames_per_second(59.94), 59.94);
        assert_eq!(preferred_frames_per_second(10.0), 10.0);
        assert_eq!(preferred_frames_per_second(0.016), 60.0);
        assert_eq!(preferred_frames_per_second(f32::NAN), 60.0);
    }
}
