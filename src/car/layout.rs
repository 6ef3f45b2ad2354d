use glam::Vec3;

use crate::{asset_pipeline::materials::Material, color::Color};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelPosition {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl WheelPosition {
    pub fn label(&self) -> &'static str {
        match self {
            WheelPosition::FrontLeft => "Front left wheel",
            WheelPosition::FrontRight => "Front right wheel",
            WheelPosition::RearLeft => "Rear left wheel",
            WheelPosition::RearRight => "Rear right wheel",
        }
    }
}

/// Where a rim/tyre pair lives in the asset and where its pivot goes on the car.
#[derive(Debug, Clone)]
pub struct WheelSpec {
    pub position: WheelPosition,
    pub rim_node: &'static str,
    pub tyre_node: &'static str,
    pub offset: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowPolicy {
    Disabled,
    Enabled,
}

impl ShadowPolicy {
    pub fn enabled(&self) -> bool {
        *self == ShadowPolicy::Enabled
    }
}

/// Fixed surface parameters written onto a named material.
#[derive(Debug, Clone)]
pub struct MaterialOverride {
    pub name: &'static str,
    pub required: bool,
    pub roughness: Option<f32>,
    pub metalness: Option<f32>,
    pub opacity: Option<f32>,
    pub color: Option<Color>,
}

impl MaterialOverride {
    pub fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            roughness: None,
            metalness: None,
            opacity: None,
            color: None,
        }
    }

    pub fn optional(name: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }

    pub fn apply(&self, material: &mut Material) {
        if let Some(roughness) = self.roughness {
            material.roughness = roughness;
        }
        if let Some(metalness) = self.metalness {
            material.metalness = metalness;
        }
        if let Some(opacity) = self.opacity {
            material.opacity = opacity;
        }
        if let Some(color) = self.color {
            material.color = color;
        }
    }
}

/// What the configurator expects to find in the car asset, and how to dress it.
#[derive(Debug, Clone)]
pub struct CarLayout {
    pub wheels: [WheelSpec; 4],
    pub wheel_scale: f32,
    /// Its colour comes from the picker.
    pub paint: MaterialOverride,
    pub trim: Vec<MaterialOverride>,
    pub body_shadows: ShadowPolicy,
    pub wheel_shadows: ShadowPolicy,
}

impl CarLayout {
    pub fn wheel_node_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.wheels
            .iter()
            .flat_map(|wheel| [wheel.rim_node, wheel.tyre_node])
    }

    pub fn material_overrides(&self) -> impl Iterator<Item = &MaterialOverride> {
        std::iter::once(&self.paint).chain(self.trim.iter())
    }
}

impl Default for CarLayout {
    /// The Porsche 930 asset.
    fn default() -> Self {
        Self {
            wheels: [
                WheelSpec {
                    position: WheelPosition::FrontRight,
                    rim_node: "mesh_5",
                    tyre_node: "mesh_6",
                    offset: Vec3::new(-0.83, 0.45, 1.6),
                },
                WheelSpec {
                    position: WheelPosition::FrontLeft,
                    rim_node: "mesh_47",
                    tyre_node: "mesh_48",
                    offset: Vec3::new(0.83, 0.45, 1.6),
                },
                WheelSpec {
                    position: WheelPosition::RearRight,
                    rim_node: "mesh_3",
                    tyre_node: "mesh_4",
                    offset: Vec3::new(-0.95, 0.45, -1.0),
                },
                WheelSpec {
                    position: WheelPosition::RearLeft,
                    rim_node: "mesh_62",
                    tyre_node: "mesh_63",
                    offset: Vec3::new(0.95, 0.45, -1.0),
                },
            ],
            wheel_scale: 0.8,
            paint: MaterialOverride {
                roughness: Some(1.0),
                metalness: Some(0.0),
                ..MaterialOverride::required("paint")
            },
            trim: vec![
                MaterialOverride {
                    roughness: Some(1.0),
                    metalness: Some(0.0),
                    ..MaterialOverride::required("930_tire")
                },
                MaterialOverride {
                    roughness: Some(0.5),
                    metalness: Some(1.0),
                    color: Some(Color::WHITE),
                    ..MaterialOverride::required("930_rim")
                },
                MaterialOverride {
                    opacity: Some(0.7),
                    color: Some(Color::from_rgb8([0x42, 0x42, 0x42])),
                    ..MaterialOverride::optional("930_lights_refraction")
                },
            ],
            body_shadows: ShadowPolicy::Disabled,
            wheel_shadows: ShadowPolicy::Enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_lists_eight_distinct_wheel_nodes() {
        let layout = CarLayout::default();
        let mut names: Vec<_> = layout.wheel_node_names().collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn override_only_touches_set_fields() {
        let mut material = Material::standard("930_rim");
        material.opacity = 0.3;

        let rim = MaterialOverride {
            roughness: Some(0.5),
            metalness: Some(1.0),
            ..MaterialOverride::required("930_rim")
        };
        rim.apply(&mut material);

        assert_eq!(material.roughness, 0.5);
        assert_eq!(material.metalness, 1.0);
        assert_eq!(material.opacity, 0.3);
    }
}
