use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use frameconfig::{FilterSetting, FrameConfig};
use presenter::format::gl;
use presenter::{
    CrtFilter, FrameBufferDescriptor, PresenterOptions, ProducerFlags, Rect, RenderSettings,
    ScreenType,
};

use crate::cli::{ProducerMode, RunArgs};

/// Everything the window and producer need, merged from config and CLI.
#[derive(Debug, Clone)]
pub struct Launch {
    pub descriptor: FrameBufferDescriptor,
    pub flags: ProducerFlags,
    pub screen: ScreenType,
    pub fps: f32,
    pub settings: RenderSettings,
    pub options: PresenterOptions,
    pub wait_timeout: Option<Duration>,
}

impl Launch {
    pub fn resolve(args: &RunArgs, config: &FrameConfig) -> Result<Self> {
        if !(args.fps.is_finite() && args.fps > 0.0) {
            bail!("--fps must be a positive number, got {}", args.fps);
        }

        let screen_rect = args
            .screen_rect
            .unwrap_or_else(|| Rect::from_size(args.buffer));
        let (mut format, mut ty) = args.format;
        if args.legacy && (format, ty) != (gl::BGRA, gl::UNSIGNED_BYTE) {
            tracing::warn!(
                format = format_args!("{format:#06x}"),
                ty = format_args!("{ty:#06x}"),
                "legacy producers render into bgra8 shared surfaces; ignoring --format"
            );
            (format, ty) = (gl::BGRA, gl::UNSIGNED_BYTE);
        }
        let descriptor = FrameBufferDescriptor::new(args.buffer, screen_rect, format, ty)
            .context("invalid producer geometry")?;

        let flags = match args.mode {
            ProducerMode::Double => ProducerFlags {
                double_buffered: true,
                ..ProducerFlags::default()
            },
            ProducerMode::Single => ProducerFlags::default(),
            ProducerMode::Speed => ProducerFlags {
                double_buffered: true,
                speed_modified: true,
                ..ProducerFlags::default()
            },
        };

        Ok(Self {
            descriptor,
            flags: ProducerFlags {
                renders_via_legacy: args.legacy,
                ..flags
            },
            screen: args.screen,
            fps: args.fps,
            settings: render_settings(args, config)?,
            options: PresenterOptions {
                upload_slots: config.presenter.upload_slots,
            },
            wait_timeout: config.presenter.wait_timeout,
        })
    }
}

fn render_settings(args: &RunArgs, config: &FrameConfig) -> Result<RenderSettings> {
    let filter = match &args.filter {
        Some(name) => frameconfig::parse_filter(name).map_err(|err| anyhow!(err))?,
        None => config.video.filter,
    };
    let crt_filter = match filter {
        FilterSetting::Off => CrtFilter::Off,
        FilterSetting::Crt => CrtFilter::Classic,
        FilterSetting::SimpleCrt => CrtFilter::Simple,
    };
    Ok(RenderSettings {
        crt_filter,
        lcd_filter_enabled: args.lcd_filter || config.video.lcd_filter,
        smoothing_enabled: args.smooth || config.video.smoothing,
        integer_scaling: args.integer_scale || config.video.integer_scale,
    })
}
