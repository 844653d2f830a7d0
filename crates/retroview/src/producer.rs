use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use presenter::gpu::{GpuSurfaceAllocator, GpuSurfaceCopier};
use presenter::{FrameGate, FrameSource, FrameStore, LegacyBridge, ScreenType};

use crate::legacy::SoftwareContext;
use crate::pattern;
use crate::settings::Launch;

/// Synthetic emulation engine handed to the presenter.
pub struct SyntheticSource {
    gate: FrameGate<FrameStore>,
    screen: ScreenType,
    fps: f32,
}

impl FrameSource for SyntheticSource {
    fn gate(&self) -> &FrameGate<FrameStore> {
        &self.gate
    }

    fn screen_type(&self) -> ScreenType {
        self.screen
    }

    fn frame_interval(&self) -> f32 {
        self.fps
    }
}

/// GPU handles a legacy producer renders with.
pub struct LegacyResources {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub allocator: GpuSurfaceAllocator,
    pub copier: GpuSurfaceCopier,
}

/// Producer thread plus the source it feeds.
pub struct ProducerThread {
    source: Arc<SyntheticSource>,
    handle: Option<JoinHandle<()>>,
}

impl ProducerThread {
    pub fn spawn(launch: &Launch, legacy: Option<LegacyResources>) -> Result<Self> {
        let store = if launch.flags.renders_via_legacy {
            FrameStore::without_pixels(launch.descriptor)
        } else {
            FrameStore::new(launch.descriptor)
        };
        let source = Arc::new(SyntheticSource {
            gate: FrameGate::new(store, launch.flags).with_wait_timeout(launch.wait_timeout),
            screen: launch.screen,
            fps: launch.fps,
        });
        let interval = Duration::from_secs_f32(1.0 / launch.fps);

        let worker = Arc::clone(&source);
        let handle = match legacy {
            Some(resources) => thread::Builder::new()
                .name("retroview-legacy".into())
                .spawn(move || run_legacy(&worker, resources, interval)),
            None => thread::Builder::new()
                .name("retroview-producer".into())
                .spawn(move || run_cpu(&worker, interval)),
        }
        .map_err(|err| anyhow!("failed to spawn producer thread: {err}"))?;

        tracing::info!(
            policy = ?source.gate.policy(),
            legacy = launch.flags.renders_via_legacy,
            fps = launch.fps,
            "producer started"
        );
        Ok(Self {
            source,
            handle: Some(handle),
        })
    }

    pub fn source(&self) -> Arc<dyn FrameSource> {
        Arc::clone(&self.source) as Arc<dyn FrameSource>
    }

    pub fn gate(&self) -> &FrameGate<FrameStore> {
        &self.source.gate
    }

    pub fn toggle_pause(&self) {
        let paused = !self.gate().is_paused();
        self.gate().set_paused(paused);
        tracing::info!(paused, "producer pause toggled");
    }

    pub fn toggle_speed(&self) {
        let speed_modified = !self.gate().flags().speed_modified;
        self.gate().set_speed_modified(speed_modified);
        tracing::info!(speed_modified, policy = ?self.gate().policy(), "speed mode toggled");
    }

    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.source.gate.shutdown();
            if handle.join().is_err() {
                tracing::error!("producer thread panicked");
            }
        }
    }
}

impl Drop for ProducerThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sleeps to a fixed cadence, resynchronising after long stalls.
struct Pacer {
    interval: Duration,
    next: Instant,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now() + interval,
        }
    }

    fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
            self.next += self.interval;
        } else {
            self.next = now + self.interval;
        }
    }
}

fn run_cpu(source: &SyntheticSource, interval: Duration) {
    let gate = &source.gate;
    let mut pacer = Pacer::new(interval);
    let mut frame = 0u64;
    while !gate.is_shut_down() {
        if gate.is_paused() {
            pacer.wait();
            continue;
        }
        let published = gate.publish(|store| {
            let descriptor = *store.descriptor();
            pattern::paint(&descriptor, store.pixels_mut(), frame);
        });
        let Some(publication) = published else {
            break;
        };
        tracing::trace!(
            generation = publication.generation,
            waited = publication.waited,
            "published frame"
        );
        frame += 1;
        pacer.wait();
    }
    tracing::debug!(frames = frame, "producer thread exiting");
}

fn run_legacy(source: &SyntheticSource, resources: LegacyResources, interval: Duration) {
    let gate = &source.gate;
    let descriptor = gate.with_content(|store| *store.descriptor());
    let LegacyResources {
        device,
        queue,
        mut allocator,
        mut copier,
    } = resources;
    let mut context = SoftwareContext::new(device, queue, descriptor);
    let mut bridge = LegacyBridge::new();
    let mut pacer = Pacer::new(interval);
    let mut frame = 0u64;

    while !gate.is_shut_down() {
        if gate.is_paused() {
            pacer.wait();
            continue;
        }
        if let Err(err) = bridge.begin_frame(&mut context, &mut allocator, &descriptor) {
            tracing::error!(error = %err, "legacy producer cannot render; stopping");
            break;
        }
        context.set_frame(frame);
        match bridge.finish_frame(&mut context, gate, &mut copier) {
            Ok(Some(generation)) => tracing::trace!(generation, "published legacy frame"),
            Ok(None) => break,
            Err(err) => tracing::warn!(error = %err, frame, "legacy frame dropped"),
        }
        frame += 1;
        pacer.wait();
    }

    bridge.teardown(&mut context);
    tracing::debug!(
        frames = frame,
        live_objects = context.live_objects(),
        "legacy producer exiting"
    );
}
