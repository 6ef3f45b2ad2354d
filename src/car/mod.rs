pub mod animator;
pub mod layout;
pub mod reconciler;

pub use animator::{AnimationConfig, FrameAnimator};
pub use layout::CarLayout;
pub use reconciler::{SceneReconciler, WheelRig};

#[cfg(test)]
pub(crate) mod test_support {
    use glam::Vec3;

    use crate::{
        asset_pipeline::materials::{Material, MaterialKind},
        material_manager::{MaterialId, MaterialManager},
        math::bounds::AABB,
        model::Model,
        scene_graph::{Object3D, ObjectId, Scene, SceneModel, SceneModelId, Transform},
    };

    /// A small stand-in for the car asset, with the node and material names the
    /// default layout expects.
    pub struct CarFixture {
        pub scene: Scene,
        pub materials: MaterialManager,
        pub model_root: ObjectId,
    }

    impl CarFixture {
        pub fn new() -> Self {
            Self::without_material("")
        }

        pub fn without_material(skipped: &str) -> Self {
            let mut scene = Scene::new();
            let mut materials = MaterialManager::new();

            let mut material = |name: &str, kind: MaterialKind| -> Option<MaterialId> {
                (name != skipped).then(|| {
                    let mut material = Material::standard(name);
                    material.kind = kind;
                    materials.add_material(material)
                })
            };

            let paint = material("paint", MaterialKind::Standard);
            let tire = material("930_tire", MaterialKind::Standard);
            let rim = material("930_rim", MaterialKind::Standard);
            let lights = material("930_lights_refraction", MaterialKind::Standard);
            let interior = material("interior", MaterialKind::Unlit);

            let geometry = scene.add_model(SceneModel::new(Model {
                name: "geometry".to_string(),
                vertices: Vec::new(),
                indices: Vec::new(),
                bounding_box: AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
            }));

            let model_root = scene.add_child(
                scene.root(),
                Object3D::group("glTF scene", Transform::default()),
            );
            let body_group =
                scene.add_child(model_root, Object3D::group("root", Transform::default()));

            add_mesh(&mut scene, body_group, "body", geometry, paint, false);
            add_mesh(&mut scene, body_group, "lights", geometry, lights, false);
            add_mesh(&mut scene, body_group, "interior", geometry, interior, true);

            let wheel_nodes = [
                ("mesh_3", rim),
                ("mesh_4", tire),
                ("mesh_5", rim),
                ("mesh_6", tire),
                ("mesh_47", rim),
                ("mesh_48", tire),
                ("mesh_62", rim),
                ("mesh_63", tire),
            ];
            for (name, material) in wheel_nodes {
                add_mesh(&mut scene, body_group, name, geometry, material, false);
            }

            scene.late_update();

            Self {
                scene,
                materials,
                model_root,
            }
        }

        pub fn material(&self, name: &str) -> &Material {
            let id = self.materials.get_by_name(name).unwrap();
            self.materials.get(id).unwrap()
        }

        /// Mesh nodes reachable from the scene root.
        pub fn attached_meshes(&self) -> usize {
            let mut count = 0;
            self.scene.traverse(self.scene.root(), |_, object| {
                if object.is_mesh() {
                    count += 1;
                }
            });
            count
        }
    }

    fn add_mesh(
        scene: &mut Scene,
        parent: ObjectId,
        name: &str,
        model: SceneModelId,
        material: Option<MaterialId>,
        receive_shadow: bool,
    ) -> ObjectId {
        let mut object = Object3D::group(name, Transform::from_translation(Vec3::X));
        object.model_id = Some(model);
        object.material_id = material;
        object.receive_shadow = receive_shadow;
        scene.add_child(parent, object)
    }
}
