use glam::{Quat, Vec3};
use rayon::prelude::*;

use crate::{
    animation::AnimationClip, asset_pipeline::materials::load_materials_from_gltf,
    material::Material, model::Model,
};

pub struct AssetNode {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
}

/// A glTF file decoded into plain CPU data, ready to be spawned into a scene.
pub struct GltfAsset {
    pub name: String,
    pub nodes: Vec<AssetNode>,
    /// Root nodes of the default scene.
    pub roots: Vec<usize>,
    /// Indexed by glTF mesh index; `None` for meshes that failed to decode.
    pub meshes: Vec<Option<Model>>,
    pub materials: Vec<Material>,
    pub clips: Vec<AnimationClip>,
}

impl GltfAsset {
    pub fn from_gltf(
        name: impl Into<String>,
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
        images: &[gltf::image::Data],
    ) -> anyhow::Result<GltfAsset> {
        let name = name.into();

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| anyhow::anyhow!("No scenes in {name}"))?;

        let nodes = document
            .nodes()
            .map(|node| {
                let (translation, rotation, scale) = node.transform().decomposed();

                AssetNode {
                    name: node
                        .name()
                        .map(String::from)
                        .unwrap_or_else(|| format!("Node {}", node.index())),
                    translation: Vec3::from(translation),
                    rotation: Quat::from_array(rotation),
                    scale: Vec3::from(scale),
                    mesh: node.mesh().map(|mesh| mesh.index()),
                    children: node.children().map(|child| child.index()).collect(),
                }
            })
            .collect();

        let meshes = document
            .meshes()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|mesh| {
                let mesh_name = mesh
                    .name()
                    .map(String::from)
                    .unwrap_or_else(|| format!("Mesh {}", mesh.index()));

                Model::from_gltf(mesh_name, mesh, buffers)
                    .map_err(|e| log::warn!("Skipping mesh: {e:#}"))
                    .ok()
            })
            .collect();

        let clips = document
            .animations()
            .map(|animation| AnimationClip::from_gltf(&animation, buffers))
            .collect();

        Ok(GltfAsset {
            name,
            nodes,
            roots: scene.nodes().map(|node| node.index()).collect(),
            meshes,
            materials: load_materials_from_gltf(document, images),
            clips,
        })
    }
}
