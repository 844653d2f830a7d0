use std::sync::{Arc, Weak};

use crate::descriptor::FrameBufferDescriptor;
use crate::gpu::InputTexture;
use crate::sync::{FrameGate, SkipReason};
use crate::types::ScreenType;

/// Everything guarded by a producer's buffer-content lock.
///
/// CPU producers write `pixels`; legacy-API producers leave them empty and
/// publish through the unified input texture instead. The texture lives here
/// so both threads only reach it while holding the lock.
#[derive(Debug)]
pub struct FrameStore {
    descriptor: FrameBufferDescriptor,
    pixels: Vec<u8>,
    input: Option<InputTexture>,
}

impl FrameStore {
    /// Allocates a zeroed raw buffer sized for `descriptor`.
    pub fn new(descriptor: FrameBufferDescriptor) -> Self {
        Self {
            descriptor,
            pixels: vec![0; descriptor.source_len()],
            input: None,
        }
    }

    /// Store for producers that never hand over CPU pixels.
    pub fn without_pixels(descriptor: FrameBufferDescriptor) -> Self {
        Self {
            descriptor,
            pixels: Vec::new(),
            input: None,
        }
    }

    pub fn descriptor(&self) -> &FrameBufferDescriptor {
        &self.descriptor
    }

    /// Swaps in new geometry in one step, resizing the raw buffer to match.
    pub fn reconfigure(&mut self, descriptor: FrameBufferDescriptor) {
        if descriptor == self.descriptor {
            return;
        }
        tracing::debug!(
            buffer = ?descriptor.buffer_size(),
            screen = ?descriptor.screen_rect(),
            format = ?descriptor.resolved().format,
            "producer geometry changed"
        );
        if !self.pixels.is_empty() {
            self.pixels.resize(descriptor.source_len(), 0);
        }
        self.descriptor = descriptor;
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn input_texture(&self) -> Option<&InputTexture> {
        self.input.as_ref()
    }

    pub(crate) fn input_slot(&mut self) -> &mut Option<InputTexture> {
        &mut self.input
    }

    pub(crate) fn split_mut(&mut self) -> (&FrameBufferDescriptor, &[u8], &mut Option<InputTexture>) {
        (&self.descriptor, &self.pixels, &mut self.input)
    }
}

/// What the presenter needs from an emulation engine.
pub trait FrameSource: Send + Sync {
    fn gate(&self) -> &FrameGate<FrameStore>;

    fn screen_type(&self) -> ScreenType {
        ScreenType::Other
    }

    /// Target frames per second.
    fn frame_interval(&self) -> f32 {
        60.0
    }

    /// Lets a producer suppress presentation while it reconfigures.
    fn skip_presentation(&self) -> bool {
        false
    }
}

/// Resolves the attached producer for one display tick.
///
/// A producer that was never attached, has been dropped, or asks not to be
/// shown yields [`SkipReason::NoProducer`] instead of an error.
pub fn live_source(
    attached: Option<&Weak<dyn FrameSource>>,
) -> Result<Arc<dyn FrameSource>, SkipReason> {
    let source = attached
        .and_then(Weak::upgrade)
        .ok_or(SkipReason::NoProducer)?;
    if source.skip_presentation() {
        return Err(SkipReason::NoProducer);
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::gl;
    use crate::sync::ProducerFlags;
    use crate::types::{Rect, Size};

    struct StillSource {
        gate: FrameGate<FrameStore>,
        hidden: bool,
    }

    impl FrameSource for StillSource {
        fn gate(&self) -> &FrameGate<FrameStore> {
            &self.gate
        }

        fn skip_presentation(&self) -> bool {
            self.hidden
        }
    }

    fn still(hidden: bool) -> Arc<dyn FrameSource> {
        Arc::new(StillSource {
            gate: FrameGate::new(FrameStore::new(descriptor(4, 4)), ProducerFlags::default()),
            hidden,
        })
    }

    fn descriptor(width: u32, height: u32) -> FrameBufferDescriptor {
        FrameBufferDescriptor::new(
            Size::new(width, height),
            Rect::new(0, 0, width, height),
            gl::RGBA,
            gl::UNSIGNED_BYTE,
        )
        .unwrap()
    }

    #[test]
    fn reconfigure_resizes_raw_buffer() {
        let mut store = FrameStore::new(descriptor(4, 4));
        assert_eq!(store.pixels().len(), 64);

        store.reconfigure(descriptor(8, 2));
        assert_eq!(store.pixels().len(), 64);
        assert_eq!(store.descriptor().buffer_size(), Size::new(8, 2));

        store.reconfigure(descriptor(8, 8));
        assert_eq!(store.pixels().len(), 256);
    }

    #[test]
    fn legacy_store_keeps_no_pixels() {
        let mut store = FrameStore::without_pixels(descriptor(16, 16));
        store.reconfigure(descriptor(32, 32));
        assert!(store.pixels().is_empty());
        assert!(store.input_texture().is_none());
    }

    #[test]
    fn missing_or_dropped_producer_is_skipped() {
        assert_eq!(live_source(None).err(), Some(SkipReason::NoProducer));

        let source = still(false);
        let attached = Arc::downgrade(&source);
        assert!(live_source(Some(&attached)).is_ok());

        drop(source);
        assert_eq!(
            live_source(Some(&attached)).err(),
            Some(SkipReason::NoProducer)
        );
    }

    #[test]
    fn producer_can_suppress_presentation() {
        let source = still(true);
        let attached = Arc::downgrade(&source);
        assert_eq!(
            live_source(Some(&attached)).err(),
            Some(SkipReason::NoProducer)
        );
    }
}
