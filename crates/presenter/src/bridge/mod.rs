//! Hand-off from a producer that renders through a legacy immediate-mode
//! context on its own thread.
//!
//! The producer renders into a framebuffer whose color attachment is backed
//! by a [`SharedSurface`]; when it finishes a frame the bridge flushes the
//! legacy command stream and, under the producer's content lock, copies the
//! visible rectangle of that surface into the unified input texture before
//! publishing a new generation on the [`FrameGate`].
//!
//! The legacy API is never touched through ambient thread-local state: every
//! operation receives the active [`GraphicsContext`] explicitly.

mod surface;

use std::num::NonZeroU32;

pub use surface::{SharedSurface, SurfaceAllocator, SurfaceMemory, SURFACE_BYTES_PER_ELEMENT};

use crate::descriptor::FrameBufferDescriptor;
use crate::error::BridgeError;
use crate::format::gl;
use crate::source::FrameStore;
use crate::sync::FrameGate;
use crate::types::{Rect, Size};

/// Object name handed out by a legacy context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlName(pub NonZeroU32);

/// The subset of a legacy immediate-mode API the bridge drives.
pub trait GraphicsContext {
    fn create_framebuffer(&mut self) -> Result<GlName, BridgeError>;

    fn bind_framebuffer(&mut self, framebuffer: Option<GlName>);

    /// Creates a texture whose storage is the shared surface's memory.
    fn create_surface_texture(&mut self, surface: &SharedSurface) -> Result<GlName, BridgeError>;

    fn attach_color_texture(&mut self, framebuffer: GlName, texture: GlName);

    fn create_depth_renderbuffer(
        &mut self,
        size: Size,
        internal_format: u32,
    ) -> Result<GlName, BridgeError>;

    fn attach_depth_renderbuffer(&mut self, framebuffer: GlName, renderbuffer: GlName);

    fn framebuffer_complete(&mut self, framebuffer: GlName) -> bool;

    fn set_viewport(&mut self, rect: Rect);

    /// Submits everything recorded so far.
    fn flush(&mut self);

    fn delete_framebuffer(&mut self, framebuffer: GlName);

    fn delete_texture(&mut self, texture: GlName);

    fn delete_renderbuffer(&mut self, renderbuffer: GlName);
}

/// Copies a region of the shared surface into the unified input texture.
pub trait SurfaceCopier {
    fn copy_to_input(
        &mut self,
        surface: &SharedSurface,
        region: Rect,
        store: &mut FrameStore,
    ) -> Result<(), BridgeError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BridgeState {
    Idle,
    Rendering,
    TornDown,
}

/// Legacy objects created together on first activation.
#[derive(Debug)]
struct Attachments {
    framebuffer: GlName,
    color: GlName,
    depth: Option<GlName>,
    surface: SharedSurface,
}

#[derive(Debug)]
pub struct LegacyBridge {
    attachments: Option<Attachments>,
    depth_format: Option<u32>,
    state: BridgeState,
}

impl Default for LegacyBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyBridge {
    /// Bridge with a 16-bit depth renderbuffer.
    pub fn new() -> Self {
        Self {
            attachments: None,
            depth_format: Some(gl::DEPTH_COMPONENT16),
            state: BridgeState::Idle,
        }
    }

    /// Bridge for producers that never depth-test.
    pub fn without_depth() -> Self {
        let mut bridge = Self::new();
        bridge.depth_format = None;
        bridge
    }

    pub fn surface(&self) -> Option<&SharedSurface> {
        self.attachments.as_ref().map(|attachments| &attachments.surface)
    }

    pub fn framebuffer(&self) -> Option<GlName> {
        self.attachments
            .as_ref()
            .map(|attachments| attachments.framebuffer)
    }

    pub fn is_torn_down(&self) -> bool {
        self.state == BridgeState::TornDown
    }

    /// Prepares the legacy context for a frame: creates the shared surface
    /// and attachments on first use, binds the framebuffer and sets the
    /// viewport to the visible rectangle.
    pub fn begin_frame<C, A>(
        &mut self,
        context: &mut C,
        allocator: &mut A,
        descriptor: &FrameBufferDescriptor,
    ) -> Result<(), BridgeError>
    where
        C: GraphicsContext,
        A: SurfaceAllocator,
    {
        if self.state == BridgeState::TornDown {
            return Err(BridgeError::TornDown);
        }

        let requested = descriptor.buffer_size();
        let framebuffer = match &self.attachments {
            Some(attachments) => {
                let surface = attachments.surface.size();
                if surface != requested {
                    tracing::warn!(
                        ?surface,
                        ?requested,
                        "producer geometry no longer matches shared surface"
                    );
                    return Err(BridgeError::GeometryMismatch { surface, requested });
                }
                attachments.framebuffer
            }
            None => {
                let attachments = self.create_attachments(context, allocator, requested)?;
                let framebuffer = attachments.framebuffer;
                self.attachments = Some(attachments);
                framebuffer
            }
        };

        context.bind_framebuffer(Some(framebuffer));
        context.set_viewport(descriptor.screen_rect());
        self.state = BridgeState::Rendering;
        Ok(())
    }

    fn create_attachments<C, A>(
        &self,
        context: &mut C,
        allocator: &mut A,
        size: Size,
    ) -> Result<Attachments, BridgeError>
    where
        C: GraphicsContext,
        A: SurfaceAllocator,
    {
        let memory = allocator.allocate(size, SURFACE_BYTES_PER_ELEMENT)?;
        if memory.size() != size {
            return Err(BridgeError::Allocation {
                size,
                reason: format!("allocator returned {:?}", memory.size()),
            });
        }
        let surface = SharedSurface::attach(memory);

        let framebuffer = context.create_framebuffer()?;
        let color = match context.create_surface_texture(&surface) {
            Ok(color) => color,
            Err(err) => {
                context.delete_framebuffer(framebuffer);
                return Err(err);
            }
        };
        context.bind_framebuffer(Some(framebuffer));
        context.attach_color_texture(framebuffer, color);

        let depth = match self.depth_format {
            Some(format) => match context.create_depth_renderbuffer(size, format) {
                Ok(depth) => {
                    context.attach_depth_renderbuffer(framebuffer, depth);
                    Some(depth)
                }
                Err(err) => {
                    context.delete_texture(color);
                    context.delete_framebuffer(framebuffer);
                    return Err(err);
                }
            },
            None => None,
        };

        if !context.framebuffer_complete(framebuffer) {
            if let Some(depth) = depth {
                context.delete_renderbuffer(depth);
            }
            context.delete_texture(color);
            context.delete_framebuffer(framebuffer);
            return Err(BridgeError::Context(format!(
                "framebuffer {} incomplete for {size:?}",
                framebuffer.0
            )));
        }

        tracing::debug!(
            surface = surface.id(),
            width = size.width,
            height = size.height,
            framebuffer = framebuffer.0.get(),
            depth = depth.is_some(),
            "created shared render target"
        );

        Ok(Attachments {
            framebuffer,
            color,
            depth,
            surface,
        })
    }

    /// Completes a producer frame: flushes the legacy context, copies the
    /// visible rectangle into the unified input texture under the content
    /// lock and publishes a new generation.
    ///
    /// Returns `Ok(None)` when the gate has been shut down.
    pub fn finish_frame<C, K>(
        &mut self,
        context: &mut C,
        gate: &FrameGate<FrameStore>,
        copier: &mut K,
    ) -> Result<Option<u64>, BridgeError>
    where
        C: GraphicsContext,
        K: SurfaceCopier,
    {
        match self.state {
            BridgeState::TornDown => return Err(BridgeError::TornDown),
            BridgeState::Idle => return Err(BridgeError::NotStarted),
            BridgeState::Rendering => {}
        }
        let Some(attachments) = self.attachments.as_ref() else {
            return Err(BridgeError::NotStarted);
        };

        context.flush();
        self.state = BridgeState::Idle;

        let surface = &attachments.surface;
        let outcome = gate.try_publish(|store| {
            let region = store.descriptor().screen_rect();
            if !region.fits_within(surface.size()) {
                return Err(BridgeError::RegionOutOfBounds {
                    rect: region,
                    surface: surface.size(),
                });
            }
            copier.copy_to_input(surface, region, store)
        });

        match outcome {
            None => Ok(None),
            Some(Ok(publication)) => Ok(Some(publication.generation)),
            Some(Err(err)) => {
                tracing::warn!(error = %err, "dropping legacy frame");
                Err(err)
            }
        }
    }

    /// Deletes every legacy object and releases the shared surface.
    /// Safe to call more than once.
    pub fn teardown<C: GraphicsContext>(&mut self, context: &mut C) {
        if let Some(mut attachments) = self.attachments.take() {
            context.bind_framebuffer(None);
            if let Some(depth) = attachments.depth {
                context.delete_renderbuffer(depth);
            }
            context.delete_texture(attachments.color);
            context.delete_framebuffer(attachments.framebuffer);
            attachments.surface.release();
            tracing::debug!("legacy bridge torn down");
        }
        self.state = BridgeState::TornDown;
    }
}

impl Drop for LegacyBridge {
    fn drop(&mut self) {
        if let Some(attachments) = &self.attachments {
            tracing::warn!(
                framebuffer = attachments.framebuffer.0.get(),
                "legacy bridge dropped without teardown; context objects leak"
            );
        }
    }
}
