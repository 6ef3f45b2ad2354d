use std::sync::Arc;

use anyhow::Context;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

use crate::color::Color;

/// Whether a surface takes part in lighting. Decided once when the asset is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    Standard,
    Unlit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    Opaque,
    Mask,
    Blend,
}

impl From<gltf::material::AlphaMode> for AlphaMode {
    fn from(mode: gltf::material::AlphaMode) -> Self {
        match mode {
            gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf::material::AlphaMode::Mask => AlphaMode::Mask,
            gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        }
    }
}

/// RGBA8 pixels, ready for upload.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    pub fn from_gltf(data: gltf::image::Data) -> anyhow::Result<Self> {
        use gltf::image::Format;

        let (width, height) = (data.width, data.height);
        let format = data.format;
        let too_short = || format!("Image data too short for {}x{} {:?}", width, height, format);

        let image = match format {
            Format::R8G8B8A8 => DynamicImage::ImageRgba8(
                RgbaImage::from_raw(width, height, data.pixels).with_context(too_short)?,
            ),
            Format::R8G8B8 => DynamicImage::ImageRgb8(
                RgbImage::from_raw(width, height, data.pixels).with_context(too_short)?,
            ),
            Format::R8G8 => DynamicImage::ImageLumaA8(
                GrayAlphaImage::from_raw(width, height, data.pixels).with_context(too_short)?,
            ),
            Format::R8 => DynamicImage::ImageLuma8(
                GrayImage::from_raw(width, height, data.pixels).with_context(too_short)?,
            ),
            other => anyhow::bail!("Unsupported image format: {:?}", other),
        };

        Ok(Self {
            width,
            height,
            pixels: image.to_rgba8().into_raw(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub kind: MaterialKind,
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub opacity: f32,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub base_color_texture: Option<Arc<TextureData>>,
}

impl Material {
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MaterialKind::Standard,
            color: Color::WHITE,
            roughness: 1.0,
            metalness: 0.0,
            opacity: 1.0,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            base_color_texture: None,
        }
    }

    pub fn is_standard(&self) -> bool {
        self.kind == MaterialKind::Standard
    }

    pub fn is_transparent(&self) -> bool {
        self.alpha_mode == AlphaMode::Blend || self.opacity < 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_images_gain_an_opaque_alpha_channel() {
        let data = gltf::image::Data {
            pixels: vec![10, 20, 30, 40, 50, 60],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };

        let texture = TextureData::from_gltf(data).unwrap();
        assert_eq!(texture.pixels, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn truncated_images_are_rejected() {
        let data = gltf::image::Data {
            pixels: vec![0; 3],
            format: gltf::image::Format::R8G8B8A8,
            width: 2,
            height: 2,
        };

        assert!(TextureData::from_gltf(data).is_err());
    }

    #[test]
    fn opacity_below_one_is_transparent() {
        let mut material = Material::standard("lights");
        assert!(!material.is_transparent());
        material.opacity = 0.7;
        assert!(material.is_transparent());
    }
}
