use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use crate::{camera::Camera, lights::SceneLights};

/// Per-frame camera and light state. Colors are premultiplied by intensity.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniformState {
    pub view_projection: Mat4,
    pub ambient_color: Vec4,
    pub light_color: Vec4,
    /// Unit vector towards the directional light; `w` is unused.
    pub light_direction: Vec4,
}

impl FrameUniformState {
    pub fn new(camera: &Camera, lights: &SceneLights) -> Self {
        let ambient = lights.ambient.color * lights.ambient.intensity;
        let light = lights.directional.color * lights.directional.intensity;

        Self {
            view_projection: camera.view_projection_matrix(),
            ambient_color: ambient.extend(1.0),
            light_color: light.extend(1.0),
            light_direction: lights.directional.direction_to_light().extend(0.0),
        }
    }
}

pub struct FrameUniform {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl FrameUniform {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame uniform buffer"),
            contents: bytemuck::cast_slice(&[FrameUniformState::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame uniform bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame uniform bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, state: FrameUniformState) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[state]));
    }
}
