use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use wgpu::util::DeviceExt;

use crate::{
    material::{Material, MaterialId},
    rendering::texture::{create_color_texture, create_white_texture},
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MaterialUniform {
    pub base_color_factor: Vec4,
}

pub struct RenderMaterial {
    _uniform_buffer: wgpu::Buffer,
    _texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
}

/// GPU copies of scene materials, uploaded the first time a primitive uses
/// them. Primitives without a material use the default white one.
pub struct RenderMaterialManager {
    device: wgpu::Device,
    queue: wgpu::Queue,

    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,

    default_material: RenderMaterial,
    materials: HashMap<MaterialId, RenderMaterial>,
}

impl RenderMaterialManager {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Base color sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let default_material = Self::create_material(
            device,
            &bind_group_layout,
            &sampler,
            "Default material",
            Vec4::ONE,
            create_white_texture(device, queue),
        );

        Self {
            device: device.clone(),
            queue: queue.clone(),
            sampler,
            bind_group_layout,
            default_material,
            materials: HashMap::new(),
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn ensure_loaded(&mut self, id: MaterialId, material: &Material) {
        if self.materials.contains_key(&id) {
            return;
        }

        let texture = match &material.base_color_texture {
            Some(image) => create_color_texture(
                &self.device,
                &self.queue,
                &format!("{} (base color)", material.name),
                image.width,
                image.height,
                &image.pixels,
            ),
            None => create_white_texture(&self.device, &self.queue),
        };

        let render_material = Self::create_material(
            &self.device,
            &self.bind_group_layout,
            &self.sampler,
            &material.name,
            material.base_color_factor,
            texture,
        );

        self.materials.insert(id, render_material);
    }

    pub fn get(&self, id: Option<MaterialId>) -> &RenderMaterial {
        id.and_then(|id| self.materials.get(&id))
            .unwrap_or(&self.default_material)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    fn create_material(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        name: &str,
        base_color_factor: Vec4,
        texture: wgpu::Texture,
    ) -> RenderMaterial {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Material uniform ({name})")),
            contents: bytemuck::cast_slice(&[MaterialUniform { base_color_factor }]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Material bind group ({name})")),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        RenderMaterial {
            _uniform_buffer: uniform_buffer,
            _texture: texture,
            bind_group,
        }
    }
}
