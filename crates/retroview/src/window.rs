use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use presenter::{DrawOutcome, PresentError, Presenter, SettingsHandle};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::producer::{LegacyResources, ProducerThread};
use crate::settings::Launch;

/// Initial window size as a multiple of the visible rectangle.
const WINDOW_SCALE: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    TogglePause,
    ToggleSpeed,
    Quit,
}

fn key_action(event: &KeyEvent) -> Option<KeyAction> {
    if event.state != ElementState::Pressed || event.repeat {
        return None;
    }
    match &event.logical_key {
        Key::Named(NamedKey::Escape) => Some(KeyAction::Quit),
        Key::Character(value) => match value.to_ascii_lowercase().as_str() {
            "p" => Some(KeyAction::TogglePause),
            "s" => Some(KeyAction::ToggleSpeed),
            "q" => Some(KeyAction::Quit),
            _ => None,
        },
        _ => None,
    }
}

pub fn run_window(launch: Launch) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let visible = launch.descriptor.screen_rect().size();
    let window = WindowBuilder::new()
        .with_title("retroview")
        .with_inner_size(PhysicalSize::new(
            visible.width * WINDOW_SCALE,
            visible.height * WINDOW_SCALE,
        ))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let settings = SettingsHandle::new(launch.settings);
    let mut presenter = Presenter::new(
        window.as_ref(),
        window.inner_size(),
        settings,
        launch.options,
    )?;

    let legacy = launch.flags.renders_via_legacy.then(|| LegacyResources {
        device: presenter.device().clone(),
        queue: presenter.queue().clone(),
        allocator: presenter.surface_allocator(),
        copier: presenter.surface_copier(),
    });
    let mut producer = ProducerThread::spawn(&launch, legacy)?;
    presenter.attach(&producer.source());

    let fps = presenter.preferred_frames_per_second();
    let period = Duration::from_secs_f32(1.0 / fps);
    tracing::info!(fps, "display loop running; P pauses, S toggles speed mode, Esc quits");

    let mut next_frame = Instant::now();
    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::KeyboardInput { event, .. } => match key_action(&event) {
                Some(KeyAction::TogglePause) => producer.toggle_pause(),
                Some(KeyAction::ToggleSpeed) => producer.toggle_speed(),
                Some(KeyAction::Quit) => elwt.exit(),
                None => {}
            },
            WindowEvent::Resized(size) => presenter.resize(size),
            WindowEvent::RedrawRequested => match presenter.draw() {
                Ok(DrawOutcome::Presented(report)) => {
                    if report.superseded > 0 {
                        tracing::debug!(
                            generation = report.generation,
                            superseded = report.superseded,
                            "producer outran the display"
                        );
                    }
                }
                Ok(DrawOutcome::Skipped(reason)) => {
                    tracing::trace!(?reason, "display tick skipped");
                }
                Err(PresentError::Surface(err)) => match err {
                    wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                        presenter.resize(presenter.size());
                    }
                    wgpu::SurfaceError::OutOfMemory => {
                        tracing::error!("surface out of memory; exiting");
                        elwt.exit();
                    }
                    wgpu::SurfaceError::Timeout => {
                        tracing::warn!("surface timeout; retrying next frame");
                    }
                    other => {
                        tracing::warn!(error = ?other, "surface error; retrying next frame");
                    }
                },
                Err(PresentError::Upload(err)) => {
                    tracing::warn!(error = %err, "frame upload failed");
                }
            },
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if now >= next_frame {
                window.request_redraw();
                next_frame = (next_frame + period).max(now);
            }
            elwt.set_control_flow(ControlFlow::WaitUntil(next_frame));
        }
        Event::LoopExiting => {
            producer.shutdown();
            let stats = presenter.stats();
            tracing::info!(
                presented = stats.presented,
                skipped = stats.skipped,
                superseded = stats.superseded,
                "display loop finished"
            );
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
