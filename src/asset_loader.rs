use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, TryRecvError},
    time::{Duration, Instant},
};

use anyhow::Context;

use crate::{
    material_manager::MaterialManager,
    scene_graph::{ObjectId, Scene},
};

pub struct LoadedAsset {
    pub path: PathBuf,
    pub document: gltf::Document,
    pub buffers: Vec<gltf::buffer::Data>,
    pub images: Vec<gltf::image::Data>,
}

impl LoadedAsset {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let (document, buffers, images) = gltf::import(path)
            .with_context(|| format!("Failed to load glTF file: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            document,
            buffers,
            images,
        })
    }

    /// Adds the asset's materials and default scene. Returns the group holding the scene.
    pub fn spawn_into(
        self,
        scene: &mut Scene,
        materials: &mut MaterialManager,
        parent: ObjectId,
    ) -> anyhow::Result<ObjectId> {
        log::debug!(
            "Spawning {}: {} nodes, {} meshes",
            self.path.display(),
            self.document.nodes().len(),
            self.document.meshes().len()
        );

        let material_ids = materials.load_all_materials_from_gltf(&self.document, self.images)?;

        let gltf_scene = self
            .document
            .default_scene()
            .or_else(|| self.document.scenes().next())
            .context("No scenes in glTF")?;

        scene.spawn_gltf_scene(materials, &material_ids, &self.buffers, &gltf_scene, parent)
    }
}

pub enum LoadStatus {
    Pending,
    Ready(Box<LoadedAsset>),
    Failed(anyhow::Error),
}

/// Loads a glTF file on a worker thread. The frame loop polls it until it resolves.
pub struct AssetLoader {
    path: PathBuf,
    started: Instant,
    receiver: mpsc::Receiver<anyhow::Result<LoadedAsset>>,
}

impl AssetLoader {
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (sender, receiver) = mpsc::channel();

        let worker_path = path.clone();
        let worker_sender = sender.clone();
        let spawned = std::thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || {
                let result = LoadedAsset::load(&worker_path);
                // The app may have closed while loading
                let _ = worker_sender.send(result);
            });

        if let Err(error) = spawned {
            let _ = sender.send(Err(anyhow::Error::new(error).context("Failed to start loader")));
        }

        log::info!("Loading {}", path.display());

        Self {
            path,
            started: Instant::now(),
            receiver,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn poll(&self) -> LoadStatus {
        match self.receiver.try_recv() {
            Ok(Ok(asset)) => {
                log::info!(
                    "Loaded {} in {:.2?}",
                    self.path.display(),
                    self.started.elapsed()
                );
                LoadStatus::Ready(Box::new(asset))
            }
            Ok(Err(error)) => LoadStatus::Failed(error),
            Err(TryRecvError::Empty) => LoadStatus::Pending,
            Err(TryRecvError::Disconnected) => {
                LoadStatus::Failed(anyhow::anyhow!("Asset loader thread exited without a result"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_pipeline::materials::MaterialKind;

    // One triangle on a node called "body", using a material called "paint"
    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "name": "Car", "nodes": [0] }],
        "nodes": [
            { "name": "root", "children": [1] },
            { "name": "body", "mesh": 0, "translation": [0.0, 1.0, 0.0] }
        ],
        "meshes": [{
            "name": "body",
            "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }]
        }],
        "materials": [{
            "name": "paint",
            "pbrMetallicRoughness": {
                "baseColorFactor": [1.0, 1.0, 1.0, 1.0],
                "metallicFactor": 0.5,
                "roughnessFactor": 0.25
            }
        }],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }]
    }"#;

    fn wait_for(loader: &AssetLoader) -> LoadStatus {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match loader.poll() {
                LoadStatus::Pending if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(5))
                }
                status => return status,
            }
        }
    }

    #[test]
    fn missing_file_fails() {
        let loader = AssetLoader::spawn("does/not/exist.gltf");
        assert!(matches!(wait_for(&loader), LoadStatus::Failed(_)));
    }

    #[test]
    fn loads_and_spawns_a_gltf_scene() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triangle.gltf");
        std::fs::write(&path, TRIANGLE_GLTF).unwrap();

        let loader = AssetLoader::spawn(&path);
        let LoadStatus::Ready(asset) = wait_for(&loader) else {
            panic!("glTF did not load");
        };

        let mut scene = Scene::new();
        let mut materials = MaterialManager::new();
        let root = scene.root();
        let car = asset.spawn_into(&mut scene, &mut materials, root).unwrap();

        assert_eq!(scene.get_object(car).unwrap().name, "Car");

        let body = scene.find_in_subtree(car, "body").unwrap();
        let body_object = scene.get_object(body).unwrap();
        assert!(body_object.is_mesh());
        assert!(scene.has_standard_material(body, &materials));

        let paint = materials.get(materials.get_by_name("paint").unwrap()).unwrap();
        assert_eq!(paint.kind, MaterialKind::Standard);
        assert_eq!(paint.roughness, 0.25);
        assert_eq!(paint.metalness, 0.5);
        assert_eq!(paint.color.to_hex(), "#ffffff");

        let model_id = body_object.model_id.unwrap();
        let model = &scene.models[model_id].model;
        assert_eq!(model.vertices.len(), 3);
        assert_eq!(model.indices, vec![0, 1, 2]);

        scene.late_update();
        let world = scene.world_matrix(body).unwrap();
        assert_eq!(world.transform_point3(glam::Vec3::ZERO), glam::Vec3::Y);
    }

    // Leaf nodes without names, as exported car models often have them
    const UNNAMED_NODES_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 1] }],
        "nodes": [{ "mesh": 0 }, { "mesh": 1 }],
        "meshes": [
            { "name": "mesh_5", "primitives": [{ "attributes": { "POSITION": 0 } }] },
            { "primitives": [{ "attributes": { "POSITION": 0 } }] }
        ],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }]
    }"#;

    #[test]
    fn unnamed_nodes_are_named_after_their_meshes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unnamed.gltf");
        std::fs::write(&path, UNNAMED_NODES_GLTF).unwrap();

        let asset = LoadedAsset::load(&path).unwrap();
        let mut scene = Scene::new();
        let mut materials = MaterialManager::new();
        let root = scene.root();
        let car = asset.spawn_into(&mut scene, &mut materials, root).unwrap();

        let named = scene.find_in_subtree(car, "mesh_5").unwrap();
        assert!(scene.get_object(named).unwrap().is_mesh());

        let indexed = scene.find_in_subtree(car, "mesh_1").unwrap();
        assert!(scene.get_object(indexed).unwrap().is_mesh());
    }
}
