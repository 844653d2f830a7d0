use std::sync::{Arc, Weak};

use anyhow::{Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::error::{PresentError, UploadError};
use crate::filter::{FilterKind, PassGeometry, SamplerKind};
use crate::layout::{fit_viewport, preferred_frames_per_second};
use crate::source::{live_source, FrameSource, FrameStore};
use crate::sync::{Presented, SkipReason, SyncPolicy};
use crate::types::{RenderSettings, ScreenType, SettingsHandle, Size};
use crate::upload::{StagedFrame, DEFAULT_RING_DEPTH};

use super::context::GpuContext;
use super::input::GpuUploader;
use super::pipeline::PipelineSet;
use super::shared::{GpuSurfaceAllocator, GpuSurfaceCopier};

/// Tuning for a [`Presenter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresenterOptions {
    pub upload_slots: usize,
}

impl Default for PresenterOptions {
    fn default() -> Self {
        Self {
            upload_slots: DEFAULT_RING_DEPTH,
        }
    }
}

/// What one display tick did.
#[derive(Debug)]
pub enum DrawOutcome {
    Presented(FrameReport),
    Skipped(SkipReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameReport {
    pub generation: u64,
    pub superseded: u64,
    pub policy: SyncPolicy,
    /// Pipeline actually used; `None` when no pipeline could be built.
    pub filter: Option<FilterKind>,
    /// Set when raw CPU pixels were staged this tick.
    pub staged: Option<StagedFrame>,
    /// False when the frame was finalized without a draw call.
    pub drew: bool,
}

/// Running totals since the presenter was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresentStats {
    pub presented: u64,
    pub skipped: u64,
    pub superseded: u64,
}

/// Consumer side of the pipeline: pulls frames from the attached
/// [`FrameSource`] and draws them into the window surface.
pub struct Presenter {
    context: GpuContext,
    pipelines: PipelineSet,
    uploader: GpuUploader,
    settings: SettingsHandle,
    applied: Option<(u64, ScreenType)>,
    current: RenderSettings,
    source: Option<Weak<dyn FrameSource>>,
    stats: PresentStats,
}

impl Presenter {
    pub fn new<T>(
        target: &T,
        size: PhysicalSize<u32>,
        settings: SettingsHandle,
        options: PresenterOptions,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size)?;
        let pipelines = PipelineSet::new(&context.device, context.surface_format);
        let uploader =
            GpuUploader::new(options.upload_slots).context("invalid upload ring depth")?;
        tracing::info!(
            width = context.size.width,
            height = context.size.height,
            format = ?context.surface_format,
            upload_slots = options.upload_slots,
            "presenter ready"
        );
        Ok(Self {
            context,
            pipelines,
            uploader,
            settings,
            applied: None,
            current: RenderSettings::default(),
            source: None,
            stats: PresentStats::default(),
        })
    }

    /// Attaches a producer. The presenter holds it weakly so dropping the
    /// producer turns draws into silent skips.
    pub fn attach(&mut self, source: &Arc<dyn FrameSource>) {
        self.source = Some(Arc::downgrade(source));
        self.applied = None;
    }

    pub fn detach(&mut self) {
        self.source = None;
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    pub fn set_settings(&self, settings: RenderSettings) {
        self.settings.replace(settings);
    }

    pub fn stats(&self) -> PresentStats {
        self.stats
    }

    /// Display rate the attached producer asks for.
    pub fn preferred_frames_per_second(&self) -> f32 {
        let interval = self
            .source
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|source| source.frame_interval())
            .unwrap_or(crate::layout::DEFAULT_FRAMES_PER_SECOND);
        preferred_frames_per_second(interval)
    }

    /// Allocator for shared surfaces on this presenter's device.
    pub fn surface_allocator(&self) -> GpuSurfaceAllocator {
        GpuSurfaceAllocator::new(self.context.device.clone())
    }

    /// Copier from shared surfaces into input textures on this device.
    pub fn surface_copier(&self) -> GpuSurfaceCopier {
        GpuSurfaceCopier::new(self.context.device.clone(), self.context.queue.clone())
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.context.queue
    }

    fn refresh_filter(&mut self, screen: ScreenType) {
        let (revision, settings) = self.settings.snapshot();
        if self.applied == Some((revision, screen)) {
            return;
        }
        let kind = FilterKind::select(&settings, screen);
        tracing::debug!(revision, ?screen, filter = kind.label(), "resolving filter pipeline");
        self.pipelines.resolve(&self.context.device, kind);
        self.current = settings;
        self.applied = Some((revision, screen));
    }

    /// Runs one display tick.
    pub fn draw(&mut self) -> Result<DrawOutcome, PresentError> {
        let source = match live_source(self.source.as_ref()) {
            Ok(source) => source,
            Err(reason) => {
                self.stats.skipped += 1;
                return Ok(DrawOutcome::Skipped(reason));
            }
        };

        self.refresh_filter(source.screen_type());

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let drawable = Size::new(self.context.config.width, self.context.config.height);
        let flip_y = source.gate().flags().renders_via_legacy;

        let device = &self.context.device;
        let queue = &self.context.queue;
        let uploader = &mut self.uploader;
        let pipelines = &self.pipelines;
        let settings = self.current;

        let presented = source.gate().present(|store| {
            render_store(
                device, queue, uploader, pipelines, &settings, store, &view, drawable, flip_y,
            )
        });

        match presented {
            Presented::Rendered(rendered) => {
                let (drew, staged, upload_error) = rendered.value;
                frame.present();
                let report = FrameReport {
                    generation: rendered.generation,
                    superseded: rendered.superseded,
                    policy: rendered.policy,
                    filter: self.pipelines.active_kind(),
                    staged,
                    drew,
                };
                self.stats.presented += 1;
                self.stats.superseded += rendered.superseded;
                match upload_error {
                    Some(err) => Err(PresentError::Upload(err)),
                    None => Ok(DrawOutcome::Presented(report)),
                }
            }
            Presented::Skipped(reason) => {
                // The acquired texture is discarded without presenting.
                drop(frame);
                self.stats.skipped += 1;
                tracing::trace!(?reason, "display tick skipped");
                Ok(DrawOutcome::Skipped(reason))
            }
        }
    }
}

/// Uploads (for CPU producers) and draws under the producer's content lock.
#[allow(clippy::too_many_arguments)]
fn render_store(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    uploader: &mut GpuUploader,
    pipelines: &PipelineSet,
    settings: &RenderSettings,
    store: &mut FrameStore,
    target: &wgpu::TextureView,
    drawable: Size,
    flip_y: bool,
) -> (bool, Option<StagedFrame>, Option<UploadError>) {
    let mut staged = None;
    let mut upload_error = None;
    if !store.pixels().is_empty() {
        match uploader.upload(device, queue, store) {
            Ok(frame) => staged = Some(frame),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    buffer = ?store.descriptor().buffer_size(),
                    screen = ?store.descriptor().screen_rect(),
                    "failed to upload frame"
                );
                upload_error = Some(err);
            }
        }
    }

    let descriptor = *store.descriptor();
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("present encoder"),
    });
    let mut drew = false;
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("present pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        match (store.input_texture(), pipelines.active_kind()) {
            (Some(input), Some(kind)) if upload_error.is_none() => {
                let viewport = fit_viewport(
                    descriptor.aspect_ratio(),
                    input.size(),
                    drawable,
                    settings.integer_scaling,
                );
                if !viewport.size().is_empty() {
                    render_pass.set_viewport(
                        viewport.x as f32,
                        viewport.y as f32,
                        viewport.width as f32,
                        viewport.height as f32,
                        0.0,
                        1.0,
                    );
                    let pass = kind.pass(&PassGeometry {
                        screen_rect: descriptor.screen_rect(),
                        texture_size: input.size(),
                        drawable,
                        flip_y,
                    });
                    drew = pipelines.encode(
                        device,
                        queue,
                        &mut render_pass,
                        &pass,
                        input,
                        SamplerKind::for_settings(settings),
                    );
                }
            }
            (_, None) => {
                tracing::debug!("no pipeline available; finalizing frame without a draw");
            }
            _ => {}
        }
    }

    // Submitted even without a draw so no work stays queued.
    queue.submit(std::iter::once(encoder.finish()));
    (drew, staged, upload_error)
}
