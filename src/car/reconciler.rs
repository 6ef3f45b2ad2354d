use std::collections::HashMap;

use glam::Quat;

use crate::{
    car::layout::{CarLayout, WheelPosition},
    color::Color,
    error::ConfiguratorError,
    material_manager::MaterialManager,
    scene_graph::{Object3D, ObjectId, Scene, Transform},
};

/// A rim and tyre copied out of the car model, turning together under one pivot.
#[derive(Debug, Clone, Copy)]
pub struct WheelAssembly {
    pub position: WheelPosition,
    pub pivot: ObjectId,
    pub rim: ObjectId,
    pub tyre: ObjectId,
}

/// The car after restructuring: a group holding the pruned model and four wheel pivots.
#[derive(Debug, Clone)]
pub struct WheelRig {
    pub car: ObjectId,
    pub model_root: ObjectId,
    pub wheels: [WheelAssembly; 4],
}

impl WheelRig {
    pub fn pivots(&self) -> [ObjectId; 4] {
        self.wheels.map(|wheel| wheel.pivot)
    }
}

struct ModelSurvey {
    wheel_nodes: [(ObjectId, ObjectId); 4],
    standard_nodes: Vec<ObjectId>,
}

/// Dresses a loaded car model: shadow flags and wheel extraction happen on the first
/// pass, material parameters on every pass.
pub struct SceneReconciler {
    layout: CarLayout,
    model_root: ObjectId,
    rig: Option<WheelRig>,
}

impl SceneReconciler {
    pub fn new(layout: CarLayout, model_root: ObjectId) -> Self {
        Self {
            layout,
            model_root,
            rig: None,
        }
    }

    pub fn rig(&self) -> Option<&WheelRig> {
        self.rig.as_ref()
    }

    /// Nothing is modified unless every required node and material is present.
    pub fn reconcile(
        &mut self,
        scene: &mut Scene,
        materials: &mut MaterialManager,
        color: Color,
    ) -> Result<&WheelRig, ConfiguratorError> {
        self.check_materials(materials)?;

        let rig = match self.rig.take() {
            Some(rig) => rig,
            None => {
                let survey = self.survey_model(scene, materials)?;
                self.apply_shadow_policy(scene, &survey.standard_nodes);
                let rig = self.build_rig(scene, survey.wheel_nodes);
                log::info!(
                    "Car restructured: {} nodes in the model, {} wheel assemblies",
                    scene.count_nodes(rig.model_root),
                    rig.wheels.len()
                );
                rig
            }
        };

        self.apply_materials(materials, color);

        Ok(self.rig.insert(rig))
    }

    fn check_materials(&self, materials: &MaterialManager) -> Result<(), ConfiguratorError> {
        for material in self.layout.material_overrides() {
            if material.required && materials.get_by_name(material.name).is_none() {
                return Err(ConfiguratorError::missing_material(material.name));
            }
        }

        Ok(())
    }

    /// Walks the model once for the wheel nodes and the nodes with standard materials.
    fn survey_model(
        &self,
        scene: &Scene,
        materials: &MaterialManager,
    ) -> Result<ModelSurvey, ConfiguratorError> {
        let wanted: Vec<&'static str> = self.layout.wheel_node_names().collect();
        let mut found: HashMap<&'static str, ObjectId> = HashMap::new();
        let mut standard_nodes = Vec::new();

        scene.traverse(self.model_root, |id, object| {
            if let Some(name) = wanted.iter().find(|name| **name == object.name) {
                found.entry(*name).or_insert(id);
            }
            if scene.has_standard_material(id, materials) {
                standard_nodes.push(id);
            }
        });

        let lookup = |name: &'static str| {
            found
                .get(name)
                .copied()
                .ok_or_else(|| ConfiguratorError::missing_node(name))
        };

        // Rim and tyre of every wheel, in layout order
        let mut wheel_nodes = [(self.model_root, self.model_root); 4];
        for (pair, spec) in wheel_nodes.iter_mut().zip(&self.layout.wheels) {
            *pair = (lookup(spec.rim_node)?, lookup(spec.tyre_node)?);
        }

        Ok(ModelSurvey {
            wheel_nodes,
            standard_nodes,
        })
    }

    fn apply_shadow_policy(&self, scene: &mut Scene, standard_nodes: &[ObjectId]) {
        let enabled = self.layout.body_shadows.enabled();

        for id in standard_nodes {
            if let Some(object) = scene.get_object_mut(*id) {
                object.cast_shadow = enabled;
                object.receive_shadow = enabled;
            }
        }

        log::debug!(
            "Shadows {} on {} nodes",
            if enabled { "enabled" } else { "disabled" },
            standard_nodes.len()
        );
    }

    fn build_rig(&self, scene: &mut Scene, wheel_nodes: [(ObjectId, ObjectId); 4]) -> WheelRig {
        let car_parent = scene
            .get_object(self.model_root)
            .and_then(|object| object.parent_id)
            .unwrap_or_else(|| scene.root());
        let car = scene.add_child(car_parent, Object3D::group("Car rig", Transform::default()));
        scene.set_object_parent(self.model_root, Some(car));

        let wheels = std::array::from_fn(|i| {
            let spec = &self.layout.wheels[i];
            let (rim_node, tyre_node) = wheel_nodes[i];

            let pivot = scene.add_child(
                car,
                Object3D::group(
                    spec.position.label(),
                    Transform::new(spec.offset, Quat::IDENTITY, self.layout.wheel_scale),
                ),
            );

            WheelAssembly {
                position: spec.position,
                pivot,
                rim: self.move_copy_to_pivot(scene, rim_node, pivot),
                tyre: self.move_copy_to_pivot(scene, tyre_node, pivot),
            }
        });

        WheelRig {
            car,
            model_root: self.model_root,
            wheels,
        }
    }

    /// Replaces `original` in the model with a copy parented to `pivot`.
    fn move_copy_to_pivot(
        &self,
        scene: &mut Scene,
        original: ObjectId,
        pivot: ObjectId,
    ) -> ObjectId {
        // Only fails for ids missing from the arena, and `original` came from a traversal
        let copy = scene.clone_subtree(original).unwrap_or(original);

        if !scene.remove_from_parent(original) {
            log::debug!("Wheel node {:?} was already detached", original);
        }

        let wheel_shadows = self.layout.wheel_shadows.enabled();
        if let Some(object) = scene.get_object_mut(copy) {
            // The pivot places the wheel, so the copy sits at its origin
            object.transform = Transform::default();
            object.cast_shadow = wheel_shadows;
            object.receive_shadow = wheel_shadows;
        }
        scene.set_object_parent(copy, Some(pivot));

        copy
    }

    fn apply_materials(&self, materials: &mut MaterialManager, color: Color) {
        for material_override in self.layout.material_overrides() {
            if let Some(material) = materials.get_by_name_mut(material_override.name) {
                material_override.apply(material);
            }
        }

        if let Some(paint) = materials.get_by_name_mut(self.layout.paint.name) {
            paint.color = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{car::test_support::CarFixture, error::AssetItem};

    fn reconcile(
        fixture: &mut CarFixture,
        reconciler: &mut SceneReconciler,
        hex: &str,
    ) -> WheelRig {
        reconciler
            .reconcile(
                &mut fixture.scene,
                &mut fixture.materials,
                Color::from_hex(hex).unwrap(),
            )
            .unwrap()
            .clone()
    }

    #[test]
    fn paint_follows_selected_colour() {
        let mut fixture = CarFixture::new();
        let mut reconciler = SceneReconciler::new(CarLayout::default(), fixture.model_root);

        reconcile(&mut fixture, &mut reconciler, "#00ff00");

        let paint = fixture.material("paint");
        assert_eq!(paint.color.to_hex(), "#00ff00");
        assert_eq!(paint.roughness, 1.0);
        assert_eq!(paint.metalness, 0.0);
    }

    #[test]
    fn trim_materials_get_fixed_parameters() {
        let mut fixture = CarFixture::new();
        let mut reconciler = SceneReconciler::new(CarLayout::default(), fixture.model_root);

        reconcile(&mut fixture, &mut reconciler, "#ff0000");

        let tire = fixture.material("930_tire");
        assert_eq!((tire.roughness, tire.metalness), (1.0, 0.0));

        let rim = fixture.material("930_rim");
        assert_eq!((rim.roughness, rim.metalness), (0.5, 1.0));
        assert_eq!(rim.color, Color::WHITE);

        let lights = fixture.material("930_lights_refraction");
        assert_eq!(lights.opacity, 0.7);
        assert_eq!(lights.color.to_hex(), "#424242");
    }

    #[test]
    fn wheels_are_moved_under_pivots() {
        let mut fixture = CarFixture::new();
        let mut reconciler = SceneReconciler::new(CarLayout::default(), fixture.model_root);

        let rig = reconcile(&mut fixture, &mut reconciler, "#ff0000");
        let scene = &fixture.scene;

        for name in CarLayout::default().wheel_node_names() {
            assert_eq!(scene.find_in_subtree(rig.model_root, name), None, "{}", name);
        }

        for wheel in &rig.wheels {
            let pivot = scene.get_object(wheel.pivot).unwrap();
            assert_eq!(pivot.child_ids, vec![wheel.rim, wheel.tyre]);
            assert_eq!(pivot.parent_id, Some(rig.car));
            assert_eq!(pivot.transform.scale(), 0.8);

            let rim = scene.get_object(wheel.rim).unwrap();
            assert!(rim.cast_shadow && rim.receive_shadow);
            assert!(rim.is_mesh());
        }

        let front_right = &rig.wheels[0];
        assert_eq!(front_right.position, WheelPosition::FrontRight);
        assert_eq!(scene.get_object(front_right.rim).unwrap().name, "mesh_5");
        assert_eq!(
            scene
                .get_object(front_right.pivot)
                .unwrap()
                .transform
                .translation(),
            glam::Vec3::new(-0.83, 0.45, 1.6)
        );
    }

    #[test]
    fn second_pass_keeps_topology_and_material_count() {
        let mut fixture = CarFixture::new();
        let mut reconciler = SceneReconciler::new(CarLayout::default(), fixture.model_root);

        let first = reconcile(&mut fixture, &mut reconciler, "#ff0000");
        let nodes_after_first = fixture.scene.count_nodes(fixture.scene.root());
        let meshes_after_first = fixture.attached_meshes();
        let materials_after_first = fixture.materials.len();

        let second = reconcile(&mut fixture, &mut reconciler, "#ff0000");

        assert_eq!(first.pivots(), second.pivots());
        assert_eq!(fixture.scene.count_nodes(fixture.scene.root()), nodes_after_first);
        assert_eq!(fixture.attached_meshes(), meshes_after_first);
        assert_eq!(fixture.materials.len(), materials_after_first);

        let paint_count = fixture
            .materials
            .iter()
            .filter(|(_, material)| material.name == "paint")
            .count();
        assert_eq!(paint_count, 1);
    }

    #[test]
    fn wheel_geometry_is_not_duplicated() {
        let mut fixture = CarFixture::new();
        let meshes_before = fixture.attached_meshes();
        let mut reconciler = SceneReconciler::new(CarLayout::default(), fixture.model_root);

        reconcile(&mut fixture, &mut reconciler, "#ff0000");
        reconcile(&mut fixture, &mut reconciler, "#ff0000");

        // Eight wheel meshes were moved, not copied
        assert_eq!(fixture.attached_meshes(), meshes_before);
    }

    #[test]
    fn colour_change_reapplies_paint_only() {
        let mut fixture = CarFixture::new();
        let mut reconciler = SceneReconciler::new(CarLayout::default(), fixture.model_root);

        reconcile(&mut fixture, &mut reconciler, "#ff0000");
        let nodes = fixture.scene.count_nodes(fixture.scene.root());

        reconcile(&mut fixture, &mut reconciler, "#123456");

        assert_eq!(fixture.material("paint").color.to_hex(), "#123456");
        assert_eq!(fixture.scene.count_nodes(fixture.scene.root()), nodes);
    }

    #[test]
    fn body_shadows_are_disabled() {
        let mut fixture = CarFixture::new();
        let body = fixture.scene.get_object_by_name("body").unwrap();
        fixture.scene.get_object_mut(body).unwrap().cast_shadow = true;

        let mut reconciler = SceneReconciler::new(CarLayout::default(), fixture.model_root);
        reconcile(&mut fixture, &mut reconciler, "#ff0000");

        let body = fixture.scene.get_object(body).unwrap();
        assert!(!body.cast_shadow);
        assert!(!body.receive_shadow);

        // Unlit surfaces are left as they were
        let interior = fixture.scene.get_object_by_name("interior").unwrap();
        assert!(fixture.scene.get_object(interior).unwrap().receive_shadow);
    }

    #[test]
    fn missing_wheel_node_aborts_without_changes() {
        let mut fixture = CarFixture::new();
        let rim = fixture.scene.get_object_by_name("mesh_47").unwrap();
        fixture.scene.remove_from_parent(rim);
        let nodes_before = fixture.scene.count_nodes(fixture.scene.root());

        let mut reconciler = SceneReconciler::new(CarLayout::default(), fixture.model_root);
        let result = reconciler.reconcile(
            &mut fixture.scene,
            &mut fixture.materials,
            Color::from_hex("#00ff00").unwrap(),
        );

        assert_eq!(
            result.unwrap_err(),
            ConfiguratorError::AssetShapeMismatch {
                kind: AssetItem::Node,
                name: "mesh_47".to_string(),
            }
        );
        assert!(reconciler.rig().is_none());
        assert_eq!(fixture.scene.count_nodes(fixture.scene.root()), nodes_before);
        assert_eq!(fixture.material("paint").color, Color::WHITE);
    }

    #[test]
    fn missing_wheel_node_leaves_shadows_alone() {
        let mut fixture = CarFixture::new();
        let tyre = fixture.scene.get_object_by_name("mesh_48").unwrap();
        fixture.scene.remove_from_parent(tyre);
        let body = fixture.scene.get_object_by_name("body").unwrap();
        fixture.scene.get_object_mut(body).unwrap().cast_shadow = true;

        let mut reconciler = SceneReconciler::new(CarLayout::default(), fixture.model_root);
        assert!(reconciler
            .reconcile(&mut fixture.scene, &mut fixture.materials, Color::default())
            .is_err());

        assert!(fixture.scene.get_object(body).unwrap().cast_shadow);
    }

    #[test]
    fn missing_required_material_is_reported() {
        let mut fixture = CarFixture::without_material("930_rim");
        let mut reconciler = SceneReconciler::new(CarLayout::default(), fixture.model_root);

        let result = reconciler.reconcile(
            &mut fixture.scene,
            &mut fixture.materials,
            Color::default(),
        );

        assert_eq!(
            result.unwrap_err(),
            ConfiguratorError::missing_material("930_rim")
        );
        assert!(fixture.scene.get_object_by_name("mesh_5").is_some());
    }

    #[test]
    fn lights_refraction_is_optional() {
        let mut fixture = CarFixture::without_material("930_lights_refraction");
        let mut reconciler = SceneReconciler::new(CarLayout::default(), fixture.model_root);

        assert!(reconciler
            .reconcile(&mut fixture.scene, &mut fixture.materials, Color::default())
            .is_ok());
    }
}
