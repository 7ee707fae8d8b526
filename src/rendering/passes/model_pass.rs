use wgpu::{
    DepthBiasState, Device, MultisampleState, PipelineCompilationOptions, RenderPass,
    RenderPassDescriptor, ShaderSource, StencilState,
};

use crate::rendering::{
    instance::Instance,
    passes::pass::{Pass, PassCreationContext},
    render_model::{MODEL_PRIMITIVE_STATE, RENDER_MODEL_VBL},
    shader_loader::{PipelineCache, PipelineId, ShaderDefinition},
    texture::DEPTH_FORMAT,
};

/// Clears color and depth, then draws every model with Lambert shading.
pub struct ModelPass {
    pipeline_id: PipelineId,
    frame_bind_group: wgpu::BindGroup,
}

pub struct ModelPassTargets {
    /// Multisampled when `resolve_target` is set, the surface view otherwise.
    pub color: wgpu::TextureView,
    pub resolve_target: Option<wgpu::TextureView>,
    pub depth: wgpu::TextureView,
    pub clear_color: wgpu::Color,
}

const MODEL_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Model Shader",
    path: "model.wgsl",
};

impl Pass for ModelPass {
    type Targets = ModelPassTargets;

    fn create(context: PassCreationContext) -> anyhow::Result<Self> {
        let PassCreationContext {
            device,
            common,
            material_manager,
            cache_builder,
        } = context;

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Model pass pipeline layout"),
                bind_group_layouts: &[
                    &common.frame_uniform.bind_group_layout,
                    material_manager.bind_group_layout(),
                ],
                push_constant_ranges: &[],
            });

        let frame_bind_group = common.frame_uniform.bind_group.clone();
        let multisample = MultisampleState {
            count: common.sample_count,
            ..Default::default()
        };

        let pipeline_id = cache_builder.add_shader(
            MODEL_SHADER,
            Box::new(
                move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
                    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some(shader_def.name),
                        source: ShaderSource::Wgsl(source.into()),
                    });

                    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some("Model pass pipeline"),
                        layout: Some(&render_pipeline_layout),
                        vertex: wgpu::VertexState {
                            module: &shader,
                            entry_point: Some("vs_main"),
                            buffers: &[RENDER_MODEL_VBL, Instance::descriptor()],
                            compilation_options: PipelineCompilationOptions::default(),
                        },
                        fragment: Some(wgpu::FragmentState {
                            module: &shader,
                            entry_point: Some("fs_main"),
                            targets: &[Some(wgpu::ColorTargetState {
                                format: common.surface_format(),
                                blend: Some(wgpu::BlendState::REPLACE),
                                write_mask: wgpu::ColorWrites::ALL,
                            })],
                            compilation_options: PipelineCompilationOptions::default(),
                        }),
                        primitive: MODEL_PRIMITIVE_STATE,
                        depth_stencil: Some(wgpu::DepthStencilState {
                            format: DEPTH_FORMAT,
                            depth_write_enabled: true,
                            depth_compare: wgpu::CompareFunction::Less,
                            stencil: StencilState::default(),
                            bias: DepthBiasState::default(),
                        }),
                        multisample,
                        multiview: None,
                        cache: None,
                    });

                    Ok(pipeline)
                },
            ),
        );

        Ok(ModelPass {
            pipeline_id,
            frame_bind_group,
        })
    }

    fn render<'a, F>(
        &self,
        targets: &Self::Targets,
        encoder: &mut wgpu::CommandEncoder,
        pipeline_cache: &PipelineCache,
        render_callback: F,
    ) where
        F: FnOnce(&mut RenderPass) + 'a,
    {
        let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Model Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.color,
                resolve_target: targets.resolve_target.as_ref(),
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(targets.clear_color),
                    store: match targets.resolve_target {
                        Some(_) => wgpu::StoreOp::Discard,
                        None => wgpu::StoreOp::Store,
                    },
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        // The background is still cleared while a shader is broken
        let Some(pipeline) = pipeline_cache.get(self.pipeline_id) else {
            return;
        };

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        render_callback(&mut render_pass);
    }
}
