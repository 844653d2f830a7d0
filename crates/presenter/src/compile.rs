use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::filter::FilterKind;

/// Binding slots shared by every pass in bind group 0.
pub(crate) const VIEW_BINDING: u32 = 0;
pub(crate) const TEXTURE_BINDING: u32 = 1;
pub(crate) const SAMPLER_BINDING: u32 = 2;
pub(crate) const PARAMETER_BINDING: u32 = 3;

/// Compiles the full-viewport triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the fragment stage for `kind`. Failures surface through the
/// device's validation error scope, not here.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    kind: FilterKind,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(kind.label()),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(fragment_source(kind)),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

pub(crate) fn fragment_source(kind: FilterKind) -> &'static str {
    match kind {
        FilterKind::Identity => BLIT_FRAGMENT_GLSL,
        FilterKind::Lcd => LCD_FRAGMENT_GLSL,
        FilterKind::CrtClassic => CRT_FRAGMENT_GLSL,
        FilterKind::CrtSimple => SIMPLE_CRT_FRAGMENT_GLSL,
    }
}

/// Full-viewport triangle. `v_uv` has a top-left origin unless the view block
/// asks for a flip, which legacy frames stored bottom-up need.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

layout(std140, set = 0, binding = 0) uniform ViewParams {
    float flip_y;
} view;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    vec2 uv = pos * 0.5 + vec2(0.5, 0.5);
    float v = mix(1.0 - uv.y, uv.y, step(0.5, view.flip_y));
    v_uv = vec2(uv.x, v);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

const BLIT_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 1) uniform texture2D input_texture;
layout(set = 0, binding = 2) uniform sampler input_sampler;

void main() {
    outColor = vec4(texture(sampler2D(input_texture, input_sampler), v_uv).rgb, 1.0);
}
";

/// Pixel-grid look of handheld LCD panels. The grid fades out when the
/// display is too small to resolve it.
const LCD_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 1) uniform texture2D input_texture;
layout(set = 0, binding = 2) uniform sampler input_sampler;

layout(std140, set = 0, binding = 3) uniform LcdParams {
    vec4 display_rect;
    vec2 texture_size;
    vec2 final_resolution;
} params;

void main() {
    vec3 color = texture(sampler2D(input_texture, input_sampler), v_uv).rgb;
    vec2 texel = v_uv * params.texture_size;
    vec2 cell = fract(texel);
    vec2 edge = smoothstep(vec2(0.0), vec2(0.15), cell) * smoothstep(vec2(0.0), vec2(0.15), vec2(1.0) - cell);
    float scale = min(params.final_resolution.x / max(params.display_rect.z, 1.0),
                      params.final_resolution.y / max(params.display_rect.w, 1.0));
    float strength = clamp((scale - 2.0) / 4.0, 0.0, 1.0);
    float grid = mix(1.0, edge.x * edge.y, 0.6 * strength);
    outColor = vec4(color * grid, 1.0);
}
";

/// Scanlines and an aperture-grille mask.
const CRT_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 1) uniform texture2D input_texture;
layout(set = 0, binding = 2) uniform sampler input_sampler;

layout(std140, set = 0, binding = 3) uniform CrtParams {
    vec4 display_rect;
    vec2 emulated_size;
    vec2 final_resolution;
} params;

void main() {
    vec2 size = max(params.display_rect.zw, vec2(1.0));
    vec3 color = texture(sampler2D(input_texture, input_sampler), v_uv).rgb;

    float line = v_uv.y * size.y;
    float scan = 0.5 + 0.5 * cos(6.2831853 * fract(line) - 3.1415927);
    float scanline = mix(0.65, 1.0, scan);

    float column = floor(v_uv.x * params.final_resolution.x);
    float phase = mod(column, 3.0);
    vec3 mask;
    if (phase < 1.0) {
        mask = vec3(1.05, 0.85, 0.85);
    } else if (phase < 2.0) {
        mask = vec3(0.85, 1.05, 0.85);
    } else {
        mask = vec3(0.85, 0.85, 1.05);
    }

    outColor = vec4(color * scanline * mask * 1.1, 1.0);
}
";

/// Curved-glass variant with vignette.
const SIMPLE_CRT_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 1) uniform texture2D input_texture;
layout(set = 0, binding = 2) uniform sampler input_sampler;

layout(std140, set = 0, binding = 3) uniform SimpleCrtParams {
    vec4 src_rect;
    vec4 dst_rect;
    float curvature_vertical;
    float curvature_horizontal;
    float curvature_strength;
    float light_boost;
    float vignette_strength;
    float zoom_out;
    float brightness;
    float padding;
} params;

vec2 curve(vec2 uv) {
    vec2 centered = (uv - vec2(0.5)) * params.zoom_out;
    vec2 offset = abs(centered.yx) / vec2(params.curvature_vertical, params.curvature_horizontal);
    centered += centered * offset * offset * params.curvature_strength * 4.0;
    return centered + vec2(0.5);
}

void main() {
    vec2 uv = curve(v_uv);
    if (uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0) {
        outColor = vec4(0.0, 0.0, 0.0, 1.0);
        return;
    }

    vec3 color = texture(sampler2D(input_texture, input_sampler), uv).rgb;
    float rows = max(params.src_rect.w, 1.0);
    float scan = 0.75 + 0.25 * sin(uv.y * rows * 6.2831853);
    color *= scan * params.light_boost;

    vec2 edge = uv * (vec2(1.0) - uv);
    float vignette = pow(edge.x * edge.y * 16.0, params.vignette_strength);
    outColor = vec4(color * vignette * params.brightness, 1.0);
}
";
