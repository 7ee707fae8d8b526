use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::BufferUsages;

/// Per-instance vertex data: world matrix and the matrix for normals.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Instance {
    pub model: Mat4,
    pub normal: Mat4,
}

impl Instance {
    pub fn from_world_matrix(model: Mat4) -> Self {
        // Any invertible matrix works, however small its scale; the shader normalizes
        let determinant = model.determinant();
        let normal = if determinant != 0.0 && determinant.is_finite() {
            model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };

        Self { model, normal }
    }

    const ATTRIBUTES: [wgpu::VertexAttribute; 8] = wgpu::vertex_attr_array![
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x4,
        10 => Float32x4
    ];

    pub fn descriptor() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Instance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub struct Instances {
    instances: Vec<Instance>,
}

impl Instances {
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
        }
    }

    pub fn add(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn should_render(&self) -> bool {
        !self.instances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn as_slice(&self) -> &[Instance] {
        &self.instances
    }
}

/// Instance vertex buffer that grows to fit.
pub struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: usize,
    label: String,
}

impl InstanceBuffer {
    const INITIAL_CAPACITY: usize = 16;

    pub fn new(device: &wgpu::Device, name: &str) -> Self {
        let label = format!("Instance buffer ({name})");
        let buffer = Self::create(device, &label, Self::INITIAL_CAPACITY);

        Self {
            buffer,
            capacity: Self::INITIAL_CAPACITY,
            label,
        }
    }

    fn create(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (size_of::<Instance>() * capacity) as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, instances: &Instances) {
        if instances.len() > self.capacity {
            self.capacity = instances.len().next_power_of_two();
            self.buffer = Self::create(device, &self.label, self.capacity);
        }

        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances.as_slice()));
    }

    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(1, self.buffer.slice(..));
    }
}
