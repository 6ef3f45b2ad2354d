use std::{collections::HashMap, sync::Arc};

use glam::Vec3;
use id_arena::{Arena, Id};

use crate::{
    asset_pipeline::materials::{Material, MaterialKind, TextureData},
    color::Color,
};

pub type MaterialId = Id<Material>;

/// Owns every material in the scene. Nodes refer to materials by id, so a change made
/// here is seen by every node sharing the material.
pub struct MaterialManager {
    materials: Arena<Material>,
    materials_by_name: HashMap<String, MaterialId>,
    default_material: Option<MaterialId>,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self {
            materials: Arena::new(),
            materials_by_name: HashMap::new(),
            default_material: None,
        }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let name = material.name.clone();
        let id = self.materials.alloc(material);

        // First material wins on duplicate names
        self.materials_by_name.entry(name).or_insert(id);

        id
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<MaterialId> {
        self.materials_by_name.get(name).copied()
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Material> {
        let id = self.get_by_name(name)?;
        self.materials.get_mut(id)
    }

    pub fn is_standard(&self, id: MaterialId) -> bool {
        self.get(id).is_some_and(Material::is_standard)
    }

    /// Material used by primitives that don't specify one.
    pub fn default_material(&mut self) -> MaterialId {
        if let Some(id) = self.default_material {
            return id;
        }

        let id = self.materials.alloc(Material::standard("Default material"));
        self.default_material = Some(id);
        id
    }

    /// Loads every material in the document. The returned ids are indexed like
    /// `document.materials()`.
    pub fn load_all_materials_from_gltf(
        &mut self,
        document: &gltf::Document,
        images: Vec<gltf::image::Data>,
    ) -> anyhow::Result<Vec<MaterialId>> {
        let mut textures: Vec<Option<Arc<TextureData>>> = Vec::with_capacity(images.len());
        for (index, image) in images.into_iter().enumerate() {
            match TextureData::from_gltf(image) {
                Ok(texture) => textures.push(Some(Arc::new(texture))),
                Err(error) => {
                    log::warn!("Skipping image {}: {:#}", index, error);
                    textures.push(None);
                }
            }
        }

        let mut ids = Vec::new();

        for material in document.materials() {
            let name = material
                .name()
                .map(String::from)
                .unwrap_or_else(|| format!("Material {}", ids.len()));

            let pbr = material.pbr_metallic_roughness();
            let [r, g, b, a] = pbr.base_color_factor();

            let base_color_texture = pbr.base_color_texture().and_then(|info| {
                let image_index = info.texture().source().index();
                textures.get(image_index).cloned().flatten()
            });

            let kind = if material.unlit() {
                MaterialKind::Unlit
            } else {
                MaterialKind::Standard
            };

            let loaded = Material {
                name,
                kind,
                // glTF factors are linear
                color: Color::from_linear(Vec3::new(r, g, b)),
                roughness: pbr.roughness_factor(),
                metalness: pbr.metallic_factor(),
                opacity: a,
                alpha_mode: material.alpha_mode().into(),
                alpha_cutoff: material.alpha_cutoff().unwrap_or(0.5),
                base_color_texture,
            };

            if self.materials_by_name.contains_key(&loaded.name) {
                log::debug!("Duplicate material name: {}", loaded.name);
            }

            ids.push(self.add_material(loaded));
        }

        log::info!("Loaded {} materials", ids.len());

        Ok(ids)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials.iter()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn draw_ui(&self, ui: &imgui::Ui) {
        ui.window("Materials")
            .position([20.0, 460.0], imgui::Condition::FirstUseEver)
            .collapsed(true, imgui::Condition::FirstUseEver)
            .build(|| {
                for (id, material) in self.materials.iter() {
                    ui.text(format!(
                        "{}: {} ({:?}) {} r={:.2} m={:.2} a={:.2}",
                        id.index(),
                        material.name,
                        material.kind,
                        material.color,
                        material.roughness,
                        material.metalness,
                        material.opacity,
                    ));
                }
            });
    }
}

impl Default for MaterialManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materials_are_found_by_name() {
        let mut manager = MaterialManager::new();
        let paint = manager.add_material(Material::standard("paint"));

        assert_eq!(manager.get_by_name("paint"), Some(paint));
        assert_eq!(manager.get_by_name("chrome"), None);
        assert!(manager.is_standard(paint));
    }

    #[test]
    fn first_material_wins_on_duplicate_names() {
        let mut manager = MaterialManager::new();
        let first = manager.add_material(Material::standard("glass"));
        manager.add_material(Material::standard("glass"));

        assert_eq!(manager.get_by_name("glass"), Some(first));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn default_material_is_created_once() {
        let mut manager = MaterialManager::new();
        let a = manager.default_material();
        let b = manager.default_material();

        assert_eq!(a, b);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn unlit_materials_are_not_standard() {
        let mut manager = MaterialManager::new();
        let mut material = Material::standard("decal");
        material.kind = MaterialKind::Unlit;
        let id = manager.add_material(material);

        assert!(!manager.is_standard(id));
    }
}
