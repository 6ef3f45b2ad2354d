use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use gltf::buffer;
use itertools::izip;

use crate::math::bounds::AABB;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
}

/// Geometry of one glTF primitive. Read-only once loaded, so clones of a node can share it.
pub struct Model {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub bounding_box: AABB,
}

pub type Buffers<'a> = &'a [buffer::Data];

impl Model {
    pub fn from_gltf_primitive(
        name: impl Into<String>,
        primitive: &gltf::Primitive,
        buffers: Buffers,
    ) -> anyhow::Result<Model> {
        let name = name.into();

        if primitive.mode() != gltf::mesh::Mode::Triangles {
            return Err(anyhow::anyhow!(
                "Unsupported primitive mode in {}: {:?}",
                name,
                primitive.mode()
            ));
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let positions = reader
            .read_positions()
            .ok_or_else(|| anyhow::anyhow!("Primitive without positions: {}", name))?
            .map(Vec3::from)
            .collect::<Vec<_>>();

        let normals = match reader.read_normals() {
            Some(normals) => normals.map(Vec3::from).collect(),
            None => vec![Vec3::Y; positions.len()],
        };

        let tex_coords = match reader.read_tex_coords(0) {
            Some(tex_coords) => tex_coords.into_f32().map(Vec2::from).collect(),
            None => vec![Vec2::ZERO; positions.len()],
        };

        let vertices = izip!(&positions, &normals, &tex_coords)
            .map(|(position, normal, tex_coords)| Vertex {
                position: *position,
                normal: *normal,
                tex_coords: *tex_coords,
            })
            .collect::<Vec<Vertex>>();

        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect::<Vec<u32>>(),
            None => (0..vertices.len() as u32).collect(),
        };

        if indices.is_empty() {
            return Err(anyhow::anyhow!("Primitive without triangles: {}", name));
        }

        let bounding_box = AABB::from_points(&positions);

        Ok(Model {
            name,
            vertices,
            indices,
            bounding_box,
        })
    }
}
