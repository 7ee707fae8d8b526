use std::mem::offset_of;

use wgpu::util::DeviceExt;

use crate::{
    material::MaterialId,
    model::{ModelPrimitive, Vertex},
    rendering::{
        instance::{InstanceBuffer, Instances},
        render_material::RenderMaterialManager,
    },
    scene_graph::SceneModel,
};

pub struct RenderPrimitive {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
    pub material: Option<MaterialId>,
}

impl RenderPrimitive {
    fn from_primitive(
        device: &wgpu::Device,
        scene_model: &SceneModel,
        primitive: &ModelPrimitive,
    ) -> Self {
        let name = &scene_model.model.name;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Vertex buffer ({name}, primitive {})", primitive.index)),
            contents: bytemuck::cast_slice(&primitive.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Index buffer ({name}, primitive {})", primitive.index)),
            contents: bytemuck::cast_slice(&primitive.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: primitive.indices.len() as u32,
            material: scene_model.material_for(primitive.material_index),
        }
    }
}

/// GPU buffers of one scene model plus the instances gathered this frame.
pub struct RenderModel {
    pub primitives: Vec<RenderPrimitive>,
    pub instances: Instances,
    pub instance_buffer: InstanceBuffer,
}

impl RenderModel {
    pub fn from_scene_model(device: &wgpu::Device, scene_model: &SceneModel) -> Self {
        let primitives = scene_model
            .model
            .primitives
            .iter()
            .map(|primitive| RenderPrimitive::from_primitive(device, scene_model, primitive))
            .collect();

        RenderModel {
            primitives,
            instances: Instances::new(),
            instance_buffer: InstanceBuffer::new(device, &scene_model.model.name),
        }
    }
}

pub fn render_model_instances(
    render_pass: &mut wgpu::RenderPass<'_>,
    render_model: &RenderModel,
    materials: &RenderMaterialManager,
) {
    render_model.instance_buffer.bind(render_pass);
    let instance_count = render_model.instances.len() as u32;

    for primitive in &render_model.primitives {
        render_pass.set_bind_group(1, &materials.get(primitive.material).bind_group, &[]);
        render_pass.set_vertex_buffer(0, primitive.vertex_buffer.slice(..));
        render_pass.set_index_buffer(primitive.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..primitive.num_indices, 0, 0..instance_count);
    }
}

pub const RENDER_MODEL_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, normal) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, tex_coords) as wgpu::BufferAddress,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
    ],
};

pub const MODEL_PRIMITIVE_STATE: wgpu::PrimitiveState = wgpu::PrimitiveState {
    topology: wgpu::PrimitiveTopology::TriangleList,
    strip_index_format: None,
    front_face: wgpu::FrontFace::Ccw,
    // glTF materials are frequently double sided
    cull_mode: None,
    polygon_mode: wgpu::PolygonMode::Fill,
    unclipped_depth: false,
    conservative: false,
};
