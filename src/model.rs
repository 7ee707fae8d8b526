use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use gltf::buffer;
use itertools::izip;

use crate::math::bounds::AABB;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
}

pub struct ModelPrimitive {
    pub index: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Asset-local material index.
    pub material_index: Option<usize>,
    pub bounds: AABB,
}

impl ModelPrimitive {
    pub fn new(
        index: usize,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        material_index: Option<usize>,
    ) -> Self {
        let bounds = AABB::from_points(vertices.iter().map(|vertex| vertex.position));

        Self {
            index,
            vertices,
            indices,
            material_index,
            bounds,
        }
    }
}

pub struct Model {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
}

pub type Buffers<'a> = &'a [buffer::Data];

impl Model {
    pub fn from_gltf(
        name: impl Into<String>,
        mesh: gltf::Mesh,
        buffers: Buffers,
    ) -> anyhow::Result<Model> {
        let mut model = Model {
            name: name.into(),
            primitives: Vec::new(),
        };

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping primitive {} of {}: unsupported mode {:?}",
                    primitive.index(),
                    model.name,
                    primitive.mode()
                );
                continue;
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let Some(position_reader) = reader.read_positions() else {
                log::warn!(
                    "Skipping primitive {} of {}: no positions",
                    primitive.index(),
                    model.name
                );
                continue;
            };
            let positions: Vec<Vec3> = position_reader.map(Vec3::from).collect();

            let normals: Option<Vec<Vec3>> = reader
                .read_normals()
                .map(|normals| normals.map(Vec3::from).collect());
            let tex_coords: Vec<Vec2> = match reader.read_tex_coords(0) {
                Some(tex_coords) => tex_coords.into_f32().map(Vec2::from).collect(),
                None => vec![Vec2::ZERO; positions.len()],
            };

            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect::<Vec<u32>>(),
                None => (0..positions.len() as u32).collect(),
            };

            let has_normals = normals.is_some();
            let normals = normals.unwrap_or_else(|| vec![Vec3::ZERO; positions.len()]);

            let vertices = izip!(positions, normals, tex_coords)
                .map(|(position, normal, tex_coords)| Vertex {
                    position,
                    normal,
                    tex_coords,
                })
                .collect::<Vec<Vertex>>();

            let mut model_primitive = ModelPrimitive::new(
                primitive.index(),
                vertices,
                indices,
                primitive.material().index(),
            );

            if !has_normals {
                model_primitive.generate_normals();
            }

            model.primitives.push(model_primitive);
        }

        if model.primitives.is_empty() {
            return Err(anyhow::anyhow!("Mesh without primitives: {}", model.name));
        }

        Ok(model)
    }

    pub fn bounds(&self) -> AABB {
        self.primitives
            .iter()
            .fold(AABB::EMPTY, |bounds, primitive| bounds.union(&primitive.bounds))
    }
}
