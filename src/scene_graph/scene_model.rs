use id_arena::Id;

use crate::{material::MaterialId, model::Model};

pub type SceneModelId = Id<SceneModel>;

pub struct SceneModel {
    pub model: Model,
    /// Scene materials indexed by the model's asset-local material indices.
    pub materials: Vec<MaterialId>,
}

impl SceneModel {
    pub fn new(model: Model, materials: Vec<MaterialId>) -> Self {
        Self { model, materials }
    }

    pub fn material_for(&self, material_index: Option<usize>) -> Option<MaterialId> {
        material_index.and_then(|index| self.materials.get(index).copied())
    }
}
