//! Command buffer replay on wgpu

use std::collections::HashMap;

use tracing::trace;

use crate::context::WgpuContext;
use crate::error::{PcssError, Result};
use crate::gpu::allocator::{GpuRenderTarget, WgpuTargetAllocator};
use crate::pcss::commands::{CommandBuffer, RenderTextureId, ShadowCommand, ShadowSamplingMode};

/// Replays recorded [`CommandBuffer`]s into a wgpu command encoder.
///
/// The active shadow map is a depth texture. Blitting it requires the
/// buffer to have switched it to [`ShadowSamplingMode::RawDepth`] first,
/// since comparison sampling cannot read raw depth values.
pub struct CommandExecutor {
    ctx: WgpuContext,
    shader: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<(wgpu::TextureFormat, u32), wgpu::RenderPipeline>,
    sampling_modes: HashMap<RenderTextureId, ShadowSamplingMode>,
    global_textures: HashMap<String, RenderTextureId>,
}

impl CommandExecutor {
    /// Create an executor on `ctx`.
    pub fn new(ctx: &WgpuContext) -> Self {
        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("pcss depth blit shader"),
                source: wgpu::ShaderSource::Wgsl(
                    include_str!("../shaders/depth_blit.wgsl").into(),
                ),
            });

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("pcss depth blit bind group layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Depth,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    }],
                });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("pcss depth blit pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        Self {
            ctx: ctx.clone(),
            shader,
            bind_group_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            sampling_modes: HashMap::new(),
            global_textures: HashMap::new(),
        }
    }

    /// Texture most recently bound to `slot`.
    pub fn global_texture(&self, slot: &str) -> Option<RenderTextureId> {
        self.global_textures.get(slot).copied()
    }

    /// Sampling mode most recently set for `texture`.
    pub fn sampling_mode(&self, texture: RenderTextureId) -> Option<ShadowSamplingMode> {
        self.sampling_modes.get(&texture).copied()
    }

    /// Replay `buffer`.
    ///
    /// `active_shadow_map` is the depth view [`RenderTextureId::CurrentActive`] resolves to.
    pub fn execute(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        buffer: &CommandBuffer,
        active_shadow_map: &wgpu::TextureView,
        targets: &WgpuTargetAllocator,
    ) -> Result<()> {
        for command in buffer.commands() {
            match command {
                ShadowCommand::SetShadowSamplingMode { target, mode } => {
                    self.sampling_modes.insert(*target, *mode);
                }
                ShadowCommand::Blit {
                    source,
                    destination,
                } => {
                    if *source != RenderTextureId::CurrentActive {
                        return Err(PcssError::Command(
                            "blit source must be the active shadow map".to_string(),
                        ));
                    }
                    if self.sampling_mode(*source) != Some(ShadowSamplingMode::RawDepth) {
                        return Err(PcssError::Command(
                            "active shadow map is not in raw depth mode".to_string(),
                        ));
                    }
                    let destination = resolve_target(*destination, targets)?;
                    self.blit_depth(encoder, active_shadow_map, destination);
                }
                ShadowCommand::SetGlobalTexture { slot, texture } => {
                    if let RenderTextureId::Target(handle) = texture {
                        if targets.get(*handle).is_none() {
                            return Err(PcssError::UnknownTarget(*handle));
                        }
                    }
                    self.global_textures.insert(slot.clone(), *texture);
                }
            }
        }
        trace!(buffer = buffer.name(), commands = buffer.commands().len(), "replayed");
        Ok(())
    }

    fn blit_depth(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::TextureView,
        destination: &GpuRenderTarget,
    ) {
        let bind_group = self
            .ctx
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("pcss depth blit bind group"),
                layout: &self.bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                }],
            });
        let pipeline = self.pipeline(destination.format(), destination.sample_count());

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pcss depth blit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: destination.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }

    fn pipeline(&mut self, format: wgpu::TextureFormat, sample_count: u32) -> &wgpu::RenderPipeline {
        let device = &self.ctx.device;
        let shader = &self.shader;
        let layout = &self.pipeline_layout;

        self.pipelines
            .entry((format, sample_count))
            .or_insert_with(|| {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("pcss depth blit pipeline"),
                    layout: Some(layout),
                    vertex: wgpu::VertexState {
                        module: shader,
                        entry_point: Some("vs_main"),
                        buffers: &[],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        strip_index_format: None,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: None,
                        unclipped_depth: false,
                        polygon_mode: wgpu::PolygonMode::Fill,
                        conservative: false,
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState {
                        count: sample_count,
                        mask: !0,
                        alpha_to_coverage_enabled: false,
                    },
                    multiview_mask: None,
                    cache: None,
                })
            })
    }
}

fn resolve_target(id: RenderTextureId, targets: &WgpuTargetAllocator) -> Result<&GpuRenderTarget> {
    match id {
        RenderTextureId::Target(handle) => targets.get(handle).ok_or(PcssError::UnknownTarget(handle)),
        RenderTextureId::CurrentActive => Err(PcssError::Command(
            "blit destination must be an allocated target".to_string(),
        )),
    }
}
