use std::sync::{Arc, PoisonError, RwLock};

/// Width/height pair in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Pixel rectangle with a top-left origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    /// True when the rectangle lies entirely inside `0..size`.
    pub fn fits_within(&self, size: Size) -> bool {
        self.right() <= u64::from(size.width) && self.bottom() <= u64::from(size.height)
    }

    pub fn as_f32(&self) -> [f32; 4] {
        [
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        ]
    }
}

/// Display technology the emulated system declares for its screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScreenType {
    Lcd,
    Crt,
    #[default]
    Other,
}

/// Which CRT shader family the user picked, if any.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CrtFilter {
    #[default]
    Off,
    Classic,
    Simple,
}

impl CrtFilter {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// User-facing presentation preferences, read once per displayed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderSettings {
    pub crt_filter: CrtFilter,
    pub lcd_filter_enabled: bool,
    pub smoothing_enabled: bool,
    pub integer_scaling: bool,
}

impl RenderSettings {
    pub fn crt_filter_enabled(&self) -> bool {
        self.crt_filter.is_enabled()
    }
}

#[derive(Debug, Default)]
struct VersionedSettings {
    revision: u64,
    settings: RenderSettings,
}

/// Shared settings cell. Writers bump the revision so readers can tell when
/// derived state (filter selection, samplers) needs refreshing.
#[derive(Clone, Debug, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<VersionedSettings>>,
}

impl SettingsHandle {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(VersionedSettings {
                revision: 0,
                settings,
            })),
        }
    }

    /// Returns the current revision alongside a copy of the settings.
    pub fn snapshot(&self) -> (u64, RenderSettings) {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        (guard.revision, guard.settings)
    }

    pub fn replace(&self, settings: RenderSettings) {
        self.update(|current| *current = settings);
    }

    pub fn update(&self, apply: impl FnOnce(&mut RenderSettings)) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.settings;
        apply(&mut guard.settings);
        if guard.settings != before {
            guard.revision += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_containment_uses_wide_arithmetic() {
        let buffer = Size::new(292, 224);
        assert!(Rect::new(8, 8, 256, 208).fits_within(buffer));
        assert!(!Rect::new(40, 0, 256, 224).fits_within(buffer));
        assert!(!Rect::new(u32::MAX, 0, 2, 1).fits_within(buffer));
    }

    #[test]
    fn settings_revision_only_moves_on_change() {
        let handle = SettingsHandle::default();
        handle.update(|settings| settings.smoothing_enabled = false);
        assert_eq!(handle.snapshot().0, 0);

        handle.update(|settings| settings.lcd_filter_enabled = true);
        let (revision, settings) = handle.snapshot();
        assert_eq!(revision, 1);
        assert!(settings.lcd_filter_enabled);
    }
}
