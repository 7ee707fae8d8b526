use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use glam::Vec3;
use wgpu::CommandEncoderDescriptor;
use winit::window::Window;

use crate::{
    camera::Camera,
    lights::SceneLights,
    rendering::{
        frame_uniform::FrameUniformState,
        instance::Instance,
        passes::{
            model_pass::{ModelPass, ModelPassTargets},
            pass::{Pass, PassCreationContext},
        },
        render_common::RenderCommon,
        render_material::RenderMaterialManager,
        render_model::{render_model_instances, RenderModel},
        shader_loader::{PipelineCacheBuilder, ShaderLoader},
        texture::RenderTarget,
    },
    scene_graph::{Scene, SceneModelId},
    viewer::FrameRenderer,
};

pub struct Renderer {
    size: (u32, u32),

    // Released on detach; nothing is drawn afterwards
    surface: Option<wgpu::Surface<'static>>,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: Arc<RenderCommon>,
    depth_texture: RenderTarget,
    // None when rendering single-sampled straight to the surface
    msaa_texture: Option<RenderTarget>,

    render_models: HashMap<SceneModelId, RenderModel>,
    material_manager: RenderMaterialManager,

    shader_loader: ShaderLoader,
    model_pass: ModelPass,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, sample_count: u32) -> anyhow::Result<Renderer> {
        let size = window.inner_size();
        let size = (size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create GPU device")?;

        log::info!("Rendering with {}", adapter.get_info().name);

        let common = Arc::new(RenderCommon::new(
            &device,
            &adapter,
            &surface,
            size.0,
            size.1,
            sample_count,
        )?);

        let depth_texture = RenderTarget::depth(&device, size.0, size.1, common.sample_count);
        let msaa_texture = (common.sample_count > 1).then(|| {
            RenderTarget::multisampled_color(
                &device,
                size.0,
                size.1,
                common.surface_format(),
                common.sample_count,
            )
        });
        log::info!("Rendering with {}x MSAA", common.sample_count);

        let material_manager = RenderMaterialManager::new(&device, &queue);

        let mut cache_builder = PipelineCacheBuilder::new();

        let model_pass = ModelPass::create(PassCreationContext {
            device: &device,
            common: common.clone(),
            material_manager: &material_manager,
            cache_builder: &mut cache_builder,
        })?;

        let shader_loader = ShaderLoader::new(device.clone(), cache_builder)?;

        Ok(Self {
            size,
            surface: Some(surface),
            device,
            queue,
            common,
            depth_texture,
            msaa_texture,
            render_models: HashMap::new(),
            material_manager,
            shader_loader,
            model_pass,
        })
    }

    /// Uploads models and materials that appeared in the scene since the
    /// last frame.
    fn upload_new_models(&mut self, scene: &Scene) {
        for (model_id, scene_model) in scene.models.iter() {
            if self.render_models.contains_key(&model_id) {
                continue;
            }

            for material_id in &scene_model.materials {
                if let Some(material) = scene.materials.get(*material_id) {
                    self.material_manager.ensure_loaded(*material_id, material);
                }
            }

            let render_model = RenderModel::from_scene_model(&self.device, scene_model);
            log::debug!(
                "Uploaded model {} with {} primitives ({} materials on GPU)",
                scene_model.model.name,
                render_model.primitives.len(),
                self.material_manager.len()
            );
            self.render_models.insert(model_id, render_model);
        }
    }

    fn gather_instances(&mut self, scene: &Scene) {
        for render_model in self.render_models.values_mut() {
            render_model.instances.clear();
        }

        for (_, object) in scene.objects.iter() {
            let Some(render_model) = object
                .model_id
                .and_then(|model_id| self.render_models.get_mut(&model_id))
            else {
                continue;
            };

            let world_matrix = *object.transform.get_world_matrix();
            render_model
                .instances
                .add(Instance::from_world_matrix(world_matrix));
        }

        for render_model in self.render_models.values_mut() {
            if render_model.instances.should_render() {
                render_model
                    .instance_buffer
                    .write(&self.device, &self.queue, &render_model.instances);
            }
        }
    }
}

impl FrameRenderer for Renderer {
    fn render(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        lights: &SceneLights,
    ) -> Result<(), wgpu::SurfaceError> {
        if self.surface.is_none() {
            return Ok(());
        }

        self.shader_loader.load_pending_shaders();

        self.upload_new_models(scene);
        self.gather_instances(scene);

        self.common
            .frame_uniform
            .update(&self.queue, FrameUniformState::new(camera, lights));

        let Some(surface) = self.surface.as_ref() else {
            return Ok(());
        };

        let output = surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let (color, resolve_target) = match self.msaa_texture.as_ref() {
            Some(msaa_texture) => (msaa_texture.view().clone(), Some(view)),
            None => (view, None),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.model_pass.render(
            &ModelPassTargets {
                color,
                resolve_target,
                depth: self.depth_texture.view().clone(),
                clear_color: to_wgpu_color(lights.background),
            },
            &mut encoder,
            &self.shader_loader.cache,
            |render_pass| {
                for render_model in self.render_models.values() {
                    if !render_model.instances.should_render() {
                        continue;
                    }

                    render_model_instances(render_pass, render_model, &self.material_manager);
                }
            },
        );

        self.queue.submit([encoder.finish()]);
        output.present();

        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.size = (width, height);
        self.depth_texture.resize(&self.device, width, height);
        if let Some(msaa_texture) = self.msaa_texture.as_mut() {
            msaa_texture.resize(&self.device, width, height);
        }

        let Some(surface) = self.surface.as_ref() else {
            return;
        };

        let mut config = match self.common.output_surface_config.write() {
            Ok(config) => config,
            Err(poisoned) => poisoned.into_inner(),
        };
        config.width = width;
        config.height = height;
        surface.configure(&self.device, &config);
    }

    fn detach(&mut self) {
        if self.surface.take().is_some() {
            self.render_models.clear();
            log::debug!("Renderer released its surface ({}x{})", self.size.0, self.size.1);
        }
    }
}

fn to_wgpu_color(color: Vec3) -> wgpu::Color {
    wgpu::Color {
        r: color.x as f64,
        g: color.y as f64,
        b: color.z as f64,
        a: 1.0,
    }
}
