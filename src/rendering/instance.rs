use std::cmp::Ordering;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::{
    material_manager::{MaterialId, MaterialManager},
    math::bounds::AABB,
    rendering::render_model::RenderModelId,
    scene_graph::Scene,
};

/// Per-object data, indexed by `instance_index` in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct InstanceData {
    model: Mat4,
    normal: Mat4,
    /// x: receives shadows
    flags: Vec4,
}

impl InstanceData {
    pub fn new(model: Mat4, normal: Mat4, receive_shadow: bool) -> Self {
        Self {
            model,
            normal,
            flags: Vec4::new(if receive_shadow { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DrawItem {
    pub render_model: RenderModelId,
    pub material: MaterialId,
    pub instance: u32,
    pub cast_shadow: bool,
    pub transparent: bool,
    world_center: Vec3,
}

/// Everything reachable from the scene root that has geometry uploaded to the GPU.
#[derive(Default)]
pub struct DrawList {
    pub instances: Vec<InstanceData>,
    pub opaque: Vec<DrawItem>,
    /// Sorted back to front.
    pub transparent: Vec<DrawItem>,
    /// World-space bounds of shadow casters.
    pub shadow_bounds: Option<AABB>,
}

impl DrawList {
    pub fn gather(
        scene: &Scene,
        materials: &MaterialManager,
        fallback_material: MaterialId,
        eye: Vec3,
    ) -> Self {
        let mut list = DrawList::default();

        scene.traverse(scene.root(), |_, object| {
            let Some(scene_model) = object.model_id.and_then(|id| scene.models.get(id)) else {
                return;
            };
            let Some(render_model) = scene_model.render_model else {
                return;
            };

            let world = *object.transform.get_world_matrix();
            let normal = *object.transform.get_normal_matrix();
            let bounds = scene_model.model.bounding_box.transform(&world);

            let material = object.material_id.unwrap_or(fallback_material);
            let transparent = materials.get(material).is_some_and(|m| m.is_transparent());

            let item = DrawItem {
                render_model,
                material,
                instance: list.instances.len() as u32,
                cast_shadow: object.cast_shadow,
                transparent,
                world_center: bounds.center(),
            };
            list.instances
                .push(InstanceData::new(world, normal, object.receive_shadow));

            if object.cast_shadow {
                list.shadow_bounds = Some(match list.shadow_bounds {
                    Some(existing) => existing.union(&bounds),
                    None => bounds,
                });
            }

            if transparent {
                list.transparent.push(item);
            } else {
                list.opaque.push(item);
            }
        });

        list.transparent.sort_by(|a, b| {
            let distance_a = a.world_center.distance_squared(eye);
            let distance_b = b.world_center.distance_squared(eye);
            distance_b
                .partial_cmp(&distance_a)
                .unwrap_or(Ordering::Equal)
        });

        list
    }

    pub fn shadow_casters(&self) -> impl Iterator<Item = &DrawItem> {
        self.opaque
            .iter()
            .chain(self.transparent.iter())
            .filter(|item| item.cast_shadow)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }
}

/// Storage buffer holding the frame's `InstanceData`. Grows when the draw list does.
pub struct InstanceBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: usize,
}

impl InstanceBuffer {
    const INITIAL_CAPACITY: usize = 256;

    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        Self::with_capacity(device, layout, Self::INITIAL_CAPACITY)
    }

    fn with_capacity(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
    ) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance storage buffer"),
            size: (std::mem::size_of::<InstanceData>() * capacity) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Instance bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group,
            capacity,
        }
    }

    pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Instance bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
    }

    pub fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        instances: &[InstanceData],
    ) {
        if instances.len() > self.capacity {
            let capacity = instances.len().next_power_of_two();
            log::debug!("Growing instance buffer to {} instances", capacity);
            *self = Self::with_capacity(device, layout, capacity);
        }

        if !instances.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use id_arena::Arena;

    use super::*;
    use crate::{
        asset_pipeline::materials::Material,
        model::Model,
        rendering::render_model::RenderModel,
        scene_graph::{Object3D, ObjectId, SceneModel, SceneModelId, Transform},
    };

    struct Fixture {
        scene: Scene,
        materials: MaterialManager,
        model: SceneModelId,
        opaque: MaterialId,
        glass: MaterialId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut scene = Scene::new();
            let mut materials = MaterialManager::new();

            let opaque = materials.add_material(Material::standard("paint"));
            let mut glass = Material::standard("glass");
            glass.opacity = 0.7;
            let glass = materials.add_material(glass);

            let mut scene_model = SceneModel::new(Model {
                name: "cube".to_string(),
                vertices: Vec::new(),
                indices: Vec::new(),
                bounding_box: AABB::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
            });
            // Ids are never dereferenced here, only carried through
            scene_model.render_model = Some(Arena::<RenderModel>::new().next_id());
            let model = scene.add_model(scene_model);

            Self {
                scene,
                materials,
                model,
                opaque,
                glass,
            }
        }

        fn mesh(&mut self, name: &str, at: Vec3, material: MaterialId, cast: bool) -> ObjectId {
            let mut object = Object3D::group(name, Transform::from_translation(at));
            object.model_id = Some(self.model);
            object.material_id = Some(material);
            object.cast_shadow = cast;
            self.scene.add_child(self.scene.root(), object)
        }

        fn gather(&mut self) -> DrawList {
            self.scene.late_update();
            DrawList::gather(&self.scene, &self.materials, self.opaque, Vec3::new(0.0, 0.0, 10.0))
        }
    }

    #[test]
    fn detached_objects_are_not_drawn() {
        let mut fixture = Fixture::new();
        fixture.mesh("kept", Vec3::ZERO, fixture.opaque, false);
        let removed = fixture.mesh("removed", Vec3::X, fixture.opaque, false);
        fixture.scene.remove_from_parent(removed);

        let list = fixture.gather();

        assert_eq!(list.len(), 1);
        assert_eq!(list.opaque.len(), 1);
        assert!(list.transparent.is_empty());
    }

    #[test]
    fn transparent_items_sort_back_to_front() {
        let mut fixture = Fixture::new();
        fixture.mesh("near", Vec3::new(0.0, 0.0, 5.0), fixture.glass, false);
        fixture.mesh("far", Vec3::new(0.0, 0.0, -5.0), fixture.glass, false);
        fixture.mesh("body", Vec3::ZERO, fixture.opaque, false);

        let list = fixture.gather();

        assert_eq!(list.opaque.len(), 1);
        let depths: Vec<f32> = list.transparent.iter().map(|item| item.world_center.z).collect();
        assert_eq!(depths, vec![-5.0, 5.0]);
    }

    #[test]
    fn shadow_bounds_cover_only_casters() {
        let mut fixture = Fixture::new();
        fixture.mesh("wheel", Vec3::new(1.0, 0.0, 0.0), fixture.opaque, true);
        fixture.mesh("other wheel", Vec3::new(-1.0, 0.0, 0.0), fixture.opaque, true);
        fixture.mesh("body", Vec3::new(0.0, 5.0, 0.0), fixture.opaque, false);

        let list = fixture.gather();
        let bounds = list.shadow_bounds.unwrap();

        assert_eq!(bounds, AABB::new(Vec3::new(-1.5, -0.5, -0.5), Vec3::new(1.5, 0.5, 0.5)));
        assert_eq!(list.shadow_casters().count(), 2);
    }

    #[test]
    fn objects_without_material_use_fallback() {
        let mut fixture = Fixture::new();
        let id = fixture.mesh("bare", Vec3::ZERO, fixture.opaque, false);
        fixture.scene.get_object_mut(id).unwrap().material_id = None;

        let list = fixture.gather();

        assert_eq!(list.opaque[0].material, fixture.opaque);
        assert_eq!(list.opaque[0].instance, 0);
    }

    #[test]
    fn instances_carry_receive_shadow_flag() {
        let instance = InstanceData::new(Mat4::IDENTITY, Mat4::IDENTITY, true);
        assert_eq!(instance.flags.x, 1.0);
    }
}
