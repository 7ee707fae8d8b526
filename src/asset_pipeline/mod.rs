pub mod generate_normals;
pub mod gltf_asset;
pub mod materials;
