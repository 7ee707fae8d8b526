// Some exporters leave normals out for flat-shaded or procedural meshes.
// Without them the directional light would contribute nothing, so smooth
// normals are rebuilt from the triangles.

use glam::Vec3;

use crate::model::ModelPrimitive;

impl ModelPrimitive {
    /// Area-weighted vertex normals from the primitive's triangle list.
    pub fn generate_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];

        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|index| index as usize);

            if a >= self.vertices.len() || b >= self.vertices.len() || c >= self.vertices.len() {
                continue;
            }

            let pa = self.vertices[a].position;
            let pb = self.vertices[b].position;
            let pc = self.vertices[c].position;

            // Unnormalized cross product weights by triangle area
            let face_normal = (pb - pa).cross(pc - pa);

            normals[a] += face_normal;
            normals[b] += face_normal;
            normals[c] += face_normal;
        }

        for (vertex, normal) in self.vertices.iter_mut().zip(normals) {
            vertex.normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use crate::model::{ModelPrimitive, Vertex};

    use super::*;

    fn vertex(position: Vec3) -> Vertex {
        Vertex {
            position,
            normal: Vec3::ZERO,
            tex_coords: Vec2::ZERO,
        }
    }

    #[test]
    fn counter_clockwise_triangle_faces_positive_z() {
        let mut primitive = ModelPrimitive::new(
            0,
            vec![
                vertex(Vec3::new(0.0, 0.0, 0.0)),
                vertex(Vec3::new(1.0, 0.0, 0.0)),
                vertex(Vec3::new(0.0, 1.0, 0.0)),
            ],
            vec![0, 1, 2],
            None,
        );

        primitive.generate_normals();

        for vertex in &primitive.vertices {
            assert!((vertex.normal - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn unreferenced_vertices_get_a_unit_normal() {
        let mut primitive = ModelPrimitive::new(0, vec![vertex(Vec3::ONE)], vec![], None);

        primitive.generate_normals();

        assert_eq!(primitive.vertices[0].normal, Vec3::Y);
    }
}
