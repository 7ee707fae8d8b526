use std::sync::Arc;

use wgpu::RenderPass;

use crate::rendering::{
    render_common::RenderCommon,
    render_material::RenderMaterialManager,
    shader_loader::{PipelineCache, PipelineCacheBuilder},
};

pub struct PassCreationContext<'a> {
    pub device: &'a wgpu::Device,
    pub common: Arc<RenderCommon>,
    pub material_manager: &'a RenderMaterialManager,
    pub cache_builder: &'a mut PipelineCacheBuilder,
}

pub trait Pass {
    type Targets;

    fn create(context: PassCreationContext) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn render<'a, F>(
        &self,
        targets: &Self::Targets,
        encoder: &mut wgpu::CommandEncoder,
        pipeline_cache: &PipelineCache,
        render_callback: F,
    ) where
        F: FnOnce(&mut RenderPass) + 'a;
}
