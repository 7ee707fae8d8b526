use glam::Vec4;
use id_arena::Id;

pub type MaterialId = Id<Material>;

pub struct Material {
    pub name: String,
    pub base_color_factor: Vec4,
    /// Always RGBA8 when present.
    pub base_color_texture: Option<gltf::image::Data>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Default material".to_string(),
            base_color_factor: Vec4::ONE,
            base_color_texture: None,
        }
    }
}
