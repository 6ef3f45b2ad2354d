use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;
use std::collections::HashMap;

use crate::material_manager::{MaterialId, MaterialManager};
use crate::model::{Buffers, Model};
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};
use crate::scene_graph::transform::Transform;

/// Node tree rooted at a single root object. Objects that can't be reached from the
/// root are kept in the arena but are not updated or drawn.
pub struct Scene {
    pub objects: Arena<Object3D>,
    pub models: Arena<SceneModel>,
    root: ObjectId,
    gltf_primitive_to_model: HashMap<(usize, usize), SceneModelId>,
}

impl Scene {
    pub fn new() -> Self {
        let mut objects = Arena::new();
        let root = objects.alloc(Object3D::group("Scene", Transform::default()));

        Self {
            objects,
            models: Arena::new(),
            root,
            gltf_primitive_to_model: HashMap::new(),
        }
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// Adds an object without attaching it anywhere.
    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    pub fn add_child(&mut self, parent_id: ObjectId, object: Object3D) -> ObjectId {
        let object_id = self.add_object(object);
        self.set_object_parent(object_id, Some(parent_id));
        object_id
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.objects.get_mut(id)
    }

    /// First object with the given name in depth-first order from the root.
    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.find_in_subtree(self.root, name)
    }

    pub fn find_in_subtree(&self, start: ObjectId, name: &str) -> Option<ObjectId> {
        self.subtree_ids(start)
            .into_iter()
            .find(|id| self.objects[*id].name == name)
    }

    #[cfg(test)]
    pub fn is_attached(&self, object_id: ObjectId) -> bool {
        let mut current = Some(object_id);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.objects.get(id).and_then(|object| object.parent_id);
        }
        false
    }

    pub fn add_model(&mut self, model: SceneModel) -> SceneModelId {
        self.models.alloc(model)
    }

    /// Depth-first, pre-order walk of `start` and everything below it.
    pub fn traverse(&self, start: ObjectId, mut visit: impl FnMut(ObjectId, &Object3D)) {
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            let Some(object) = self.objects.get(id) else {
                continue;
            };

            visit(id, object);
            stack.extend(object.child_ids.iter().rev().copied());
        }
    }

    pub fn subtree_ids(&self, start: ObjectId) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        self.traverse(start, |id, _| ids.push(id));
        ids
    }

    pub fn count_nodes(&self, start: ObjectId) -> usize {
        let mut count = 0;
        self.traverse(start, |_, _| count += 1);
        count
    }

    pub fn has_standard_material(&self, object_id: ObjectId, materials: &MaterialManager) -> bool {
        self.objects
            .get(object_id)
            .and_then(|object| object.material_id)
            .is_some_and(|material_id| materials.is_standard(material_id))
    }

    /// Deep-copies an object and its descendants. The copy starts detached; geometry
    /// and materials are shared with the original.
    pub fn clone_subtree(&mut self, object_id: ObjectId) -> Option<ObjectId> {
        let source = self.objects.get(object_id)?;

        let mut copy = source.clone();
        copy.parent_id = None;
        copy.child_ids = Vec::new();
        copy.transform.invalidate_local();
        let child_ids = source.child_ids.clone();

        let copy_id = self.add_object(copy);

        for child_id in child_ids {
            if let Some(child_copy_id) = self.clone_subtree(child_id) {
                self.set_object_parent(child_copy_id, Some(copy_id));
            }
        }

        Some(copy_id)
    }

    /// Detaches an object from its parent. Returns false if it had no parent, which
    /// makes repeated calls harmless.
    pub fn remove_from_parent(&mut self, object_id: ObjectId) -> bool {
        let has_parent = self
            .objects
            .get(object_id)
            .is_some_and(|object| object.parent_id.is_some());

        if has_parent {
            self.set_object_parent(object_id, None);
        }

        has_parent
    }

    pub fn spawn_gltf_scene(
        &mut self,
        materials: &mut MaterialManager,
        material_ids: &[MaterialId],
        buffers: Buffers,
        scene: &gltf::Scene,
        parent: ObjectId,
    ) -> anyhow::Result<ObjectId> {
        let name = scene.name().unwrap_or("glTF scene");
        let group_id = self.add_child(parent, Object3D::group(name, Transform::default()));

        for node in scene.nodes() {
            self.spawn_gltf_node(materials, material_ids, buffers, &node, group_id)?;
        }

        Ok(group_id)
    }

    fn spawn_gltf_node(
        &mut self,
        materials: &mut MaterialManager,
        material_ids: &[MaterialId],
        buffers: Buffers,
        node: &gltf::Node,
        parent: ObjectId,
    ) -> anyhow::Result<ObjectId> {
        let node_name = gltf_node_name(node);
        let (translation, rotation, scale) = node.transform().decomposed();

        let transform = Transform::new(
            translation.into(),
            Quat::from_array(rotation),
            // Non-uniform scale isn't supported, take x
            scale[0],
        );

        let object_id = self.add_child(parent, Object3D::group(node_name.clone(), transform));

        if let Some(mesh) = node.mesh() {
            let primitive_count = mesh.primitives().len();

            for primitive in mesh.primitives() {
                let model_id = self.model_for_primitive(&mesh, &primitive, &node_name, buffers)?;

                let material_id = match primitive.material().index() {
                    Some(index) => material_ids.get(index).copied().ok_or_else(|| {
                        anyhow::anyhow!("Material index {} out of range in {}", index, node_name)
                    })?,
                    None => materials.default_material(),
                };

                // A single primitive lives on the node itself, several become children
                if primitive_count == 1 {
                    let object = &mut self.objects[object_id];
                    object.model_id = Some(model_id);
                    object.material_id = Some(material_id);
                } else {
                    let mut child = Object3D::group(
                        format!("{}_{}", node_name, primitive.index()),
                        Transform::default(),
                    );
                    child.model_id = Some(model_id);
                    child.material_id = Some(material_id);
                    self.add_child(object_id, child);
                }
            }
        }

        for child in node.children() {
            self.spawn_gltf_node(materials, material_ids, buffers, &child, object_id)?;
        }

        Ok(object_id)
    }

    fn model_for_primitive(
        &mut self,
        mesh: &gltf::Mesh,
        primitive: &gltf::Primitive,
        node_name: &str,
        buffers: Buffers,
    ) -> anyhow::Result<SceneModelId> {
        let key = (mesh.index(), primitive.index());

        if let Some(model_id) = self.gltf_primitive_to_model.get(&key) {
            return Ok(*model_id);
        }

        let mesh_name = mesh
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("{} (Mesh)", node_name));

        let model = Model::from_gltf_primitive(
            format!("{} #{}", mesh_name, primitive.index()),
            primitive,
            buffers,
        )?;
        let model_id = self.add_model(SceneModel::new(model));
        self.gltf_primitive_to_model.insert(key, model_id);

        Ok(model_id)
    }

    /// Updates world transforms of everything attached to the root
    fn update_transforms(&self) {
        self.update_object_transform_recursive(self.root, Mat4::IDENTITY, false);
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

    /// Invalidates world transforms for an object and all its descendants
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        self.traverse(object_id, |_, object| object.transform.invalidate_world());
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if Some(child_id) == new_parent_id {
            return;
        }

        // Remove from old parent's children list
        if let Some(old_parent_id) = self.objects.get(child_id).and_then(|child| child.parent_id) {
            if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child_id);
            }
        }

        // Set new parent and add to new parent's children list
        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent_id) = new_parent_id {
                if let Some(new_parent) = self.objects.get_mut(new_parent_id) {
                    new_parent.child_ids.push(child_id);
                }
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

    pub fn get_object_transform(&self, object_id: ObjectId) -> Option<&Transform> {
        self.objects.get(object_id).map(|object| &object.transform)
    }

    pub fn world_matrix(&self, object_id: ObjectId) -> Option<Mat4> {
        self.objects
            .get(object_id)
            .map(|object| *object.transform.get_world_matrix())
    }

    pub fn late_update(&mut self) {
        self.update_transforms();
    }
}

/// Unnamed nodes take their mesh's name, or `mesh_{index}` for unnamed meshes.
fn gltf_node_name(node: &gltf::Node) -> String {
    if let Some(name) = node.name() {
        return name.to_string();
    }

    match node.mesh() {
        Some(mesh) => mesh
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index())),
        None => format!("node_{}", node.index()),
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Object3D {
        Object3D::group(name, Transform::default())
    }

    #[test]
    fn traversal_is_depth_first_pre_order() {
        let mut scene = Scene::new();
        let a = scene.add_child(scene.root(), named("a"));
        scene.add_child(a, named("a1"));
        scene.add_child(a, named("a2"));
        scene.add_child(scene.root(), named("b"));

        let mut names = Vec::new();
        scene.traverse(scene.root(), |_, object| names.push(object.name.clone()));

        assert_eq!(names, vec!["Scene", "a", "a1", "a2", "b"]);
    }

    #[test]
    fn remove_from_parent_is_idempotent() {
        let mut scene = Scene::new();
        let body = scene.add_child(scene.root(), named("body"));
        let wheel = scene.add_child(body, named("wheel"));

        assert!(scene.remove_from_parent(wheel));
        assert!(!scene.remove_from_parent(wheel));

        assert_eq!(scene.count_nodes(scene.root()), 2);
        assert!(!scene.is_attached(wheel));
        assert!(scene.get_object(wheel).unwrap().parent(&scene).is_none());
        assert_eq!(scene.get_object_by_name("wheel"), None);
    }

    #[test]
    fn clone_subtree_copies_children_and_starts_detached() {
        let mut scene = Scene::new();
        let rim = scene.add_child(scene.root(), named("rim"));
        scene.add_child(rim, named("bolt"));
        scene.get_object_mut(rim).unwrap().cast_shadow = true;

        let copy = scene.clone_subtree(rim).unwrap();
        let copy_object = scene.get_object(copy).unwrap();

        assert_ne!(copy, rim);
        assert!(copy_object.parent_id.is_none());
        assert!(copy_object.cast_shadow);
        let children: Vec<_> = copy_object
            .children(&scene)
            .map(|child| child.name.clone())
            .collect();
        assert_eq!(children, vec!["bolt"]);

        // The original keeps its own child
        assert_eq!(scene.get_object(rim).unwrap().child_ids.len(), 1);
        assert_eq!(scene.count_nodes(scene.root()), 3);
    }

    #[test]
    fn mutating_a_clone_leaves_the_original_alone() {
        let mut scene = Scene::new();
        let tyre = scene.add_child(scene.root(), named("tyre"));
        let copy = scene.clone_subtree(tyre).unwrap();

        scene.set_object_translation(copy, Vec3::X);
        scene.get_object_mut(copy).unwrap().receive_shadow = true;

        let original = scene.get_object(tyre).unwrap();
        assert_eq!(original.transform.translation(), Vec3::ZERO);
        assert!(!original.receive_shadow);
    }

    #[test]
    fn world_matrices_follow_parents() {
        let mut scene = Scene::new();
        let parent = scene.add_child(
            scene.root(),
            Object3D::group("parent", Transform::from_translation(Vec3::X)),
        );
        let child = scene.add_child(
            parent,
            Object3D::group("child", Transform::from_translation(Vec3::Y)),
        );

        scene.late_update();
        let world = scene.world_matrix(child).unwrap();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 1.0, 0.0));

        scene.set_object_translation(parent, Vec3::Z);
        scene.late_update();
        let world = scene.world_matrix(child).unwrap();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(0.0, 1.0, 1.0));
    }

    #[test]
    fn reparenting_moves_child_lists() {
        let mut scene = Scene::new();
        let a = scene.add_child(scene.root(), named("a"));
        let b = scene.add_child(scene.root(), named("b"));
        let c = scene.add_child(a, named("c"));

        scene.set_object_parent(c, Some(b));

        assert!(scene.get_object(a).unwrap().child_ids.is_empty());
        assert_eq!(scene.get_object(b).unwrap().child_ids, vec![c]);
        assert_eq!(scene.find_in_subtree(b, "c"), Some(c));
    }
}
