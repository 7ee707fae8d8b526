use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;

use crate::animation::AnimationClip;
use crate::asset_pipeline::gltf_asset::{AssetNode, GltfAsset};
use crate::material::{Material, MaterialId};
use crate::math::bounds::AABB;
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};
use crate::scene_graph::transform::Transform;

/// Result of spawning a glTF asset into a scene.
pub struct SpawnedAsset {
    /// Object parenting every root node of the asset.
    pub root: ObjectId,
    /// Scene object for each asset node, indexed by node index. Nodes that
    /// are not part of the asset's scene stay `None`.
    pub node_objects: Vec<Option<ObjectId>>,
    pub clips: Vec<AnimationClip>,
}

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub models: Arena<SceneModel>,
    pub materials: Arena<Material>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            models: Arena::new(),
            materials: Arena::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    #[cfg(test)]
    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    #[cfg(test)]
    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    pub fn add_model(&mut self, model: SceneModel) -> SceneModelId {
        self.models.alloc(model)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.alloc(material)
    }

    /// Number of objects that reference a model.
    #[cfg(test)]
    pub fn model_object_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|(_, object)| object.model_id.is_some())
            .count()
    }

    pub fn spawn_gltf_asset(&mut self, asset: GltfAsset) -> SpawnedAsset {
        let material_ids: Vec<MaterialId> = asset
            .materials
            .into_iter()
            .map(|material| self.add_material(material))
            .collect();

        let model_ids: Vec<Option<SceneModelId>> = asset
            .meshes
            .into_iter()
            .map(|model| model.map(|model| self.add_model(SceneModel::new(model, material_ids.clone()))))
            .collect();

        let root = self.add_object(Object3D::named(asset.name));
        let mut node_objects = vec![None; asset.nodes.len()];

        for &node_index in &asset.roots {
            self.spawn_node(&asset.nodes, node_index, root, &model_ids, &mut node_objects);
        }

        SpawnedAsset {
            root,
            node_objects,
            clips: asset.clips,
        }
    }

    fn spawn_node(
        &mut self,
        nodes: &[AssetNode],
        node_index: usize,
        parent: ObjectId,
        model_ids: &[Option<SceneModelId>],
        node_objects: &mut [Option<ObjectId>],
    ) {
        let Some(node) = nodes.get(node_index) else {
            log::warn!("Node index {node_index} out of bounds");
            return;
        };

        if node_objects[node_index].is_some() {
            log::warn!("Node {} is referenced more than once", node.name);
            return;
        }

        let object = Object3D {
            name: node.name.clone(),
            transform: Transform::from_trs(node.translation, node.rotation, node.scale),
            model_id: node.mesh.and_then(|mesh| model_ids.get(mesh).copied().flatten()),
            ..Default::default()
        };

        let object_id = self.add_object(object);
        node_objects[node_index] = Some(object_id);
        self.set_object_parent(object_id, Some(parent));

        for &child in &node.children {
            self.spawn_node(nodes, child, object_id, model_ids, node_objects);
        }
    }

    /// Updates all object transforms in hierarchical order
    pub fn update_transforms(&self) {
        let root_objects = self
            .objects
            .iter()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id);

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY, false);
        }
    }

    fn update_object_transform_recursive(
        &self,
        object_id: ObjectId,
        parent_world_matrix: Mat4,
        parent_changed: bool,
    ) {
        if let Some(object) = self.objects.get(object_id) {
            let changed = parent_changed || object.transform.is_world_dirty();

            if changed {
                let local_matrix = *object.transform.get_local_matrix();
                object
                    .transform
                    .set_world_matrix(parent_world_matrix * local_matrix);
            }

            let world_matrix = *object.transform.get_world_matrix();
            for &child_id in &object.child_ids {
                self.update_object_transform_recursive(child_id, world_matrix, changed);
            }
        }
    }

    /// World-space bounds of every model below (and including) `root`, built
    /// from each model's local box transformed by its object's world matrix.
    pub fn compute_bounding_box(&self, root: ObjectId) -> AABB {
        self.update_transforms();

        let mut bounds = AABB::EMPTY;
        let mut stack = vec![root];

        while let Some(object_id) = stack.pop() {
            let Some(object) = self.objects.get(object_id) else {
                continue;
            };

            if let Some(model) = object.model_id.and_then(|id| self.models.get(id)) {
                let world_matrix = *object.transform.get_world_matrix();
                bounds = bounds.union(&model.model.bounds().transformed(&world_matrix));
            }

            stack.extend(object.child_ids.iter().copied());
        }

        bounds
    }

    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(old_parent_id) = self.objects.get(child_id).and_then(|child| child.parent_id) {
            if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child_id);
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent) = new_parent_id.and_then(|id| self.objects.get_mut(id)) {
                new_parent.child_ids.push(child_id);
            }
        }

        self.invalidate_object_hierarchy(child_id);
    }

    pub fn set_object_translation(&mut self, object_id: ObjectId, translation: Vec3) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_translation(translation);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_rotation(&mut self, object_id: ObjectId, rotation: Quat) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_rotation(rotation);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_scale(&mut self, object_id: ObjectId, scale: Vec3) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_scale(scale);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_transform(
        &mut self,
        object_id: ObjectId,
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_transform(translation, rotation, scale);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    #[cfg(test)]
    pub fn get_object_transform(&self, object_id: ObjectId) -> Option<&Transform> {
        self.objects.get(object_id).map(|object| &object.transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{box_asset, box_model};

    #[test]
    fn child_world_matrix_includes_parent() {
        let mut scene = Scene::new();
        let parent = scene.add_object(Object3D::named("Parent"));
        let child = scene.add_object(Object3D::named("Child"));
        scene.set_object_parent(child, Some(parent));

        scene.set_object_translation(parent, Vec3::new(1.0, 0.0, 0.0));
        scene.set_object_translation(child, Vec3::new(0.0, 2.0, 0.0));
        scene.update_transforms();

        let world = *scene.get_object_transform(child).unwrap().get_world_matrix();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 0.0));

        // Moving only the parent still moves the child
        scene.set_object_scale(parent, Vec3::splat(2.0));
        scene.update_transforms();
        let world = *scene.get_object_transform(child).unwrap().get_world_matrix();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 4.0, 0.0));
    }

    #[test]
    fn reparenting_moves_child_between_lists() {
        let mut scene = Scene::new();
        let a = scene.add_object(Object3D::named("A"));
        let b = scene.add_object(Object3D::named("B"));
        let child = scene.add_object(Object3D::named("Child"));

        scene.set_object_parent(child, Some(a));
        scene.set_object_parent(child, Some(b));

        assert!(scene.get_object(a).unwrap().child_ids.is_empty());
        assert_eq!(scene.get_object(b).unwrap().child_ids, vec![child]);
        assert_eq!(scene.get_object(child).unwrap().parent_id, Some(b));
    }

    #[test]
    fn spawned_asset_keeps_hierarchy_and_shares_meshes() {
        let mut scene = Scene::new();
        let asset = box_asset(Vec3::ZERO, Vec3::ONE, 0);

        let spawned = scene.spawn_gltf_asset(asset);

        assert_eq!(spawned.node_objects.len(), 2);
        let parent = spawned.node_objects[0].unwrap();
        let child = spawned.node_objects[1].unwrap();
        assert_eq!(scene.get_object(child).unwrap().parent_id, Some(parent));
        assert_eq!(scene.get_object(parent).unwrap().parent_id, Some(spawned.root));
        assert_eq!(scene.model_object_count(), 2);
        assert_eq!(scene.models.len(), 1);
        assert_eq!(scene.get_object_by_name("Box child"), Some(child));
    }

    #[test]
    fn bounding_box_uses_world_transforms() {
        let mut scene = Scene::new();
        let root = scene.add_object(Object3D::named("Root"));
        let model_id = scene.add_model(SceneModel::new(
            box_model(Vec3::splat(-1.0), Vec3::splat(1.0)),
            Vec::new(),
        ));
        let object = scene.add_object(Object3D {
            name: "Box".to_string(),
            model_id: Some(model_id),
            ..Default::default()
        });
        scene.set_object_parent(object, Some(root));
        scene.set_object_translation(object, Vec3::new(10.0, 0.0, 0.0));
        scene.set_object_scale(root, Vec3::splat(3.0));

        let bounds = scene.compute_bounding_box(root);

        assert_eq!(bounds.min, Vec3::new(27.0, -3.0, -3.0));
        assert_eq!(bounds.max, Vec3::new(33.0, 3.0, 3.0));
    }

    #[test]
    fn bounding_box_of_empty_hierarchy_is_empty() {
        let mut scene = Scene::new();
        let root = scene.add_object(Object3D::named("Empty"));

        assert!(scene.compute_bounding_box(root).is_empty());
    }
}
