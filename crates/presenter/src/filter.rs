//! Post-processing selection and the uniform contract each filter pipeline
//! expects.
//!
//! Selection happens once per settings revision; the per-frame work is
//! filling in the typed uniform block for whichever pass was chosen.

use bytemuck::{Pod, Zeroable};

use crate::types::{CrtFilter, Rect, RenderSettings, ScreenType, Size};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterKind {
    #[default]
    Identity,
    Lcd,
    CrtClassic,
    CrtSimple,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::Identity,
        FilterKind::Lcd,
        FilterKind::CrtClassic,
        FilterKind::CrtSimple,
    ];

    /// A filter applies only when it is enabled and matches the producer's
    /// screen technology. Since the screen type is a single tag, at most one
    /// filter can ever win.
    pub fn select(settings: &RenderSettings, screen: ScreenType) -> Self {
        match screen {
            ScreenType::Lcd if settings.lcd_filter_enabled => Self::Lcd,
            ScreenType::Crt => match settings.crt_filter {
                CrtFilter::Off => Self::Identity,
                CrtFilter::Classic => Self::CrtClassic,
                CrtFilter::Simple => Self::CrtSimple,
            },
            _ => Self::Identity,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Identity => "blit",
            Self::Lcd => "lcd",
            Self::CrtClassic => "crt",
            Self::CrtSimple => "simple-crt",
        }
    }

    pub fn has_parameters(&self) -> bool {
        !matches!(self, Self::Identity)
    }

    /// Size in bytes of the filter parameter block, zero for the blit.
    pub fn parameter_size(&self) -> u64 {
        let size = match self {
            Self::Identity => 0,
            Self::Lcd => std::mem::size_of::<LcdUniforms>(),
            Self::CrtClassic => std::mem::size_of::<CrtUniforms>(),
            Self::CrtSimple => std::mem::size_of::<SimpleCrtUniforms>(),
        };
        size as u64
    }

    pub fn pass(&self, frame: &PassGeometry) -> FilterPass {
        let view = ViewUniforms::new(frame.flip_y);
        let parameters = match self {
            Self::Identity => FilterParameters::Identity,
            Self::Lcd => FilterParameters::Lcd(LcdUniforms {
                display_rect: frame.screen_rect.as_f32(),
                texture_size: size_f32(frame.texture_size),
                final_resolution: size_f32(frame.drawable),
            }),
            Self::CrtClassic => FilterParameters::CrtClassic(CrtUniforms {
                display_rect: frame.screen_rect.as_f32(),
                emulated_size: size_f32(frame.texture_size),
                final_resolution: size_f32(frame.drawable),
            }),
            Self::CrtSimple => {
                FilterParameters::CrtSimple(SimpleCrtUniforms::new(frame))
            }
        };
        FilterPass { view, parameters }
    }
}

/// Everything a filter needs to map emulated pixels onto the drawable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassGeometry {
    /// Visible rectangle inside the producer's buffer.
    pub screen_rect: Rect,
    /// Dimensions of the unified input texture.
    pub texture_size: Size,
    /// Drawable dimensions of the presentation surface.
    pub drawable: Size,
    /// Set for frames that arrive bottom-up from the legacy bridge.
    pub flip_y: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterPass {
    pub view: ViewUniforms,
    pub parameters: FilterParameters,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterParameters {
    Identity,
    Lcd(LcdUniforms),
    CrtClassic(CrtUniforms),
    CrtSimple(SimpleCrtUniforms),
}

impl FilterPass {
    pub fn kind(&self) -> FilterKind {
        match self.parameters {
            FilterParameters::Identity => FilterKind::Identity,
            FilterParameters::Lcd(_) => FilterKind::Lcd,
            FilterParameters::CrtClassic(_) => FilterKind::CrtClassic,
            FilterParameters::CrtSimple(_) => FilterKind::CrtSimple,
        }
    }

    /// Raw bytes of the filter parameter block, if the pass has one.
    pub fn parameter_bytes(&self) -> Option<&[u8]> {
        match &self.parameters {
            FilterParameters::Identity => None,
            FilterParameters::Lcd(uniforms) => Some(bytemuck::bytes_of(uniforms)),
            FilterParameters::CrtClassic(uniforms) => Some(bytemuck::bytes_of(uniforms)),
            FilterParameters::CrtSimple(uniforms) => Some(bytemuck::bytes_of(uniforms)),
        }
    }
}

/// How the input texture is sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    Nearest,
    Linear,
}

impl SamplerKind {
    pub fn for_settings(settings: &RenderSettings) -> Self {
        if settings.smoothing_enabled {
            Self::Linear
        } else {
            Self::Nearest
        }
    }

    pub fn filter_mode(&self) -> wgpu::FilterMode {
        match self {
            Self::Nearest => wgpu::FilterMode::Nearest,
            Self::Linear => wgpu::FilterMode::Linear,
        }
    }
}

fn size_f32(size: Size) -> [f32; 2] {
    [size.width as f32, size.height as f32]
}

/// Vertex-stage block shared by every pass.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewUniforms {
    pub flip_y: f32,
    pub _padding: [f32; 3],
}

unsafe impl Zeroable for ViewUniforms {}
unsafe impl Pod for ViewUniforms {}

impl ViewUniforms {
    pub fn new(flip_y: bool) -> Self {
        Self {
            flip_y: if flip_y { 1.0 } else { 0.0 },
            _padding: [0.0; 3],
        }
    }
}

#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LcdUniforms {
    pub display_rect: [f32; 4],
    pub texture_size: [f32; 2],
    pub final_resolution: [f32; 2],
}

unsafe impl Zeroable for LcdUniforms {}
unsafe impl Pod for LcdUniforms {}

#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrtUniforms {
    pub display_rect: [f32; 4],
    pub emulated_size: [f32; 2],
    pub final_resolution: [f32; 2],
}

unsafe impl Zeroable for CrtUniforms {}
unsafe impl Pod for CrtUniforms {}

/// Curvature and vignette parameters of the simple CRT shader.
///
/// `src_rect` is the visible frame at the origin; `dst_rect` packs the input
/// texture size followed by the drawable size.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimpleCrtUniforms {
    pub src_rect: [f32; 4],
    pub dst_rect: [f32; 4],
    pub curvature_vertical: f32,
    pub curvature_horizontal: f32,
    pub curvature_strength: f32,
    pub light_boost: f32,
    pub vignette_strength: f32,
    pub zoom_out: f32,
    pub brightness: f32,
    pub _padding: f32,
}

unsafe impl Zeroable for SimpleCrtUniforms {}
unsafe impl Pod for SimpleCrtUniforms {}

impl SimpleCrtUniforms {
    fn new(frame: &PassGeometry) -> Self {
        let visible = frame.screen_rect.size();
        Self {
            src_rect: [0.0, 0.0, visible.width as f32, visible.height as f32],
            dst_rect: [
                frame.texture_size.width as f32,
                frame.texture_size.height as f32,
                frame.drawable.width as f32,
                frame.drawable.height as f32,
            ],
            curvature_vertical: 5.0,
            curvature_horizontal: 4.0,
            curvature_strength: 0.25,
            light_boost: 1.3,
            vignette_strength: 0.05,
            zoom_out: 1.1,
            brightness: 1.0,
            _padding: 0.0,
        }
    }
}
