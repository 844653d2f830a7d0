use crate::compile::{
    compile_fragment_shader, compile_vertex_shader, PARAMETER_BINDING, SAMPLER_BINDING,
    TEXTURE_BINDING, VIEW_BINDING,
};
use crate::filter::{FilterKind, FilterPass, SamplerKind, ViewUniforms};

use super::input::InputTexture;

/// A built render pipeline for one filter kind.
pub(crate) struct FilterPipeline {
    kind: FilterKind,
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    parameters: Option<wgpu::Buffer>,
}

impl FilterPipeline {
    fn build(
        device: &wgpu::Device,
        vertex_module: &wgpu::ShaderModule,
        surface_format: wgpu::TextureFormat,
        kind: FilterKind,
    ) -> Result<Self, wgpu::Error> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let fragment_module = compile_fragment_shader(device, kind);
        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("filter layout"),
            entries: &layout_entries(kind),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("filter pipeline layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(kind.label()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: vertex_module,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        let parameters = kind.has_parameters().then(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("filter parameters"),
                size: kind.parameter_size(),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(err);
        }

        Ok(Self {
            kind,
            pipeline,
            bind_layout,
            parameters,
        })
    }
}

fn layout_entries(kind: FilterKind) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = vec![
        wgpu::BindGroupLayoutEntry {
            binding: VIEW_BINDING,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: TEXTURE_BINDING,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: SAMPLER_BINDING,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
    ];
    if kind.has_parameters() {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: PARAMETER_BINDING,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
    }
    entries
}

fn create_sampler(device: &wgpu::Device, kind: SamplerKind) -> wgpu::Sampler {
    let filter = kind.filter_mode();
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(match kind {
            SamplerKind::Nearest => "nearest sampler",
            SamplerKind::Linear => "linear sampler",
        }),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// The active filter pipeline plus the resources every pass shares.
///
/// Resolution happens when the filter selection changes. A filter that
/// fails to build leaves the blit in place until the next selection change;
/// if even the blit fails there is no pipeline and draws are skipped.
pub(crate) struct PipelineSet {
    vertex_module: wgpu::ShaderModule,
    surface_format: wgpu::TextureFormat,
    view_buffer: wgpu::Buffer,
    nearest: wgpu::Sampler,
    linear: wgpu::Sampler,
    requested: Option<FilterKind>,
    active: Option<FilterPipeline>,
}

impl PipelineSet {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let vertex_module = compile_vertex_shader(device);
        let view_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("view uniforms"),
            size: std::mem::size_of::<ViewUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            vertex_module,
            surface_format,
            view_buffer,
            nearest: create_sampler(device, SamplerKind::Nearest),
            linear: create_sampler(device, SamplerKind::Linear),
            requested: None,
            active: None,
        }
    }

    /// Kind actually drawn, which differs from the requested one after a
    /// build failure.
    pub fn active_kind(&self) -> Option<FilterKind> {
        self.active.as_ref().map(|pipeline| pipeline.kind)
    }

    pub fn resolve(&mut self, device: &wgpu::Device, kind: FilterKind) {
        if self.requested == Some(kind) {
            return;
        }
        self.requested = Some(kind);
        if self.active_kind() == Some(kind) {
            return;
        }

        match FilterPipeline::build(device, &self.vertex_module, self.surface_format, kind) {
            Ok(pipeline) => {
                tracing::debug!(filter = kind.label(), "filter pipeline ready");
                self.active = Some(pipeline);
                return;
            }
            Err(err) => {
                tracing::warn!(
                    filter = kind.label(),
                    error = %err,
                    "failed to build filter pipeline; falling back to blit"
                );
            }
        }

        if self.active_kind() == Some(FilterKind::Identity) {
            return;
        }
        self.active = match FilterPipeline::build(
            device,
            &self.vertex_module,
            self.surface_format,
            FilterKind::Identity,
        ) {
            Ok(pipeline) => Some(pipeline),
            Err(err) => {
                tracing::error!(error = %err, "failed to build blit pipeline; frames will not be drawn");
                None
            }
        };
    }

    /// Records one draw of `input` through the active pipeline.
    ///
    /// Returns `false` when nothing could be drawn.
    pub fn encode(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        render_pass: &mut wgpu::RenderPass<'_>,
        pass: &FilterPass,
        input: &InputTexture,
        sampler: SamplerKind,
    ) -> bool {
        let Some(active) = self.active.as_ref() else {
            return false;
        };

        queue.write_buffer(&self.view_buffer, 0, bytemuck::bytes_of(&pass.view));

        // The active pipeline may be a blit fallback for a filter pass.
        let parameters = match (&active.parameters, pass.parameter_bytes()) {
            (Some(buffer), Some(bytes)) if active.kind == pass.kind() => {
                queue.write_buffer(buffer, 0, bytes);
                Some(buffer)
            }
            (Some(_), _) => {
                tracing::debug!(
                    active = active.kind.label(),
                    requested = pass.kind().label(),
                    "pass does not match active pipeline"
                );
                return false;
            }
            (None, _) => None,
        };

        let sampler = match sampler {
            SamplerKind::Nearest => &self.nearest,
            SamplerKind::Linear => &self.linear,
        };
        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: VIEW_BINDING,
                resource: self.view_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: TEXTURE_BINDING,
                resource: wgpu::BindingResource::TextureView(input.view()),
            },
            wgpu::BindGroupEntry {
                binding: SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ];
        if let Some(buffer) = parameters {
            entries.push(wgpu::BindGroupEntry {
                binding: PARAMETER_BINDING,
                resource: buffer.as_entire_binding(),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("filter bind group"),
            layout: &active.bind_layout,
            entries: &entries,
        });

        render_pass.set_pipeline(&active.pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1);
        true
    }
}
