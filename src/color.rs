use std::{fmt, str::FromStr};

use glam::Vec3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("colour must start with '#': {0:?}")]
    MissingHash(String),
    #[error("colour must have 3 or 6 hex digits: {0:?}")]
    InvalidLength(String),
    #[error("invalid hex digit in colour: {0:?}")]
    InvalidDigit(String),
}

/// An sRGB colour with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError::MissingHash(hex.to_string()))?;

        let channels: [u8; 3] = match digits.len() {
            // "#fff" expands each digit, so f -> ff
            3 => {
                let mut channels = [0; 3];
                for (channel, digit) in channels.iter_mut().zip(digits.chars()) {
                    let value = digit
                        .to_digit(16)
                        .ok_or_else(|| ColorParseError::InvalidDigit(hex.to_string()))?;
                    *channel = (value * 17) as u8;
                }
                channels
            }
            6 => {
                let mut channels = [0; 3];
                for (i, channel) in channels.iter_mut().enumerate() {
                    let pair = digits
                        .get(i * 2..i * 2 + 2)
                        .ok_or_else(|| ColorParseError::InvalidDigit(hex.to_string()))?;
                    *channel = u8::from_str_radix(pair, 16)
                        .map_err(|_| ColorParseError::InvalidDigit(hex.to_string()))?;
                }
                channels
            }
            _ => return Err(ColorParseError::InvalidLength(hex.to_string())),
        };

        Ok(Self::from_rgb8(channels))
    }

    pub fn from_rgb8([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub fn to_rgb8(&self) -> [u8; 3] {
        [self.r, self.g, self.b].map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    /// Converts from the sRGB transfer curve to linear light for shading.
    pub fn to_linear(&self) -> Vec3 {
        fn channel(c: f32) -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }

        Vec3::new(channel(self.r), channel(self.g), channel(self.b))
    }

    pub fn from_linear(linear: Vec3) -> Self {
        fn channel(c: f32) -> f32 {
            if c <= 0.0031308 {
                c * 12.92
            } else {
                1.055 * c.powf(1.0 / 2.4) - 0.055
            }
        }

        Self::rgb(channel(linear.x), channel(linear.y), channel(linear.z))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::RED
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[f32; 3]> for Color {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<Color> for [f32; 3] {
    fn from(color: Color) -> Self {
        [color.r, color.g, color.b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_hex() {
        let color = Color::from_hex("#00ff00").unwrap();
        assert_eq!(color, Color::rgb(0.0, 1.0, 0.0));
        assert_eq!(color.to_hex(), "#00ff00");
    }

    #[test]
    fn parses_shorthand_and_uppercase() {
        assert_eq!(Color::from_hex("#fff").unwrap(), Color::WHITE);
        assert_eq!(Color::from_hex("#42A5F5").unwrap().to_hex(), "#42a5f5");
        assert_eq!("#424242".parse::<Color>().unwrap().to_rgb8(), [0x42; 3]);
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(matches!(
            Color::from_hex("ff0000"),
            Err(ColorParseError::MissingHash(_))
        ));
        assert!(matches!(
            Color::from_hex("#ff00"),
            Err(ColorParseError::InvalidLength(_))
        ));
        assert!(matches!(
            Color::from_hex("#gg0000"),
            Err(ColorParseError::InvalidDigit(_))
        ));
        assert!(matches!(
            Color::from_hex("#ééé"),
            Err(ColorParseError::InvalidLength(_) | ColorParseError::InvalidDigit(_))
        ));
    }

    #[test]
    fn default_is_red() {
        assert_eq!(Color::default().to_hex(), "#ff0000");
    }

    #[test]
    fn linear_conversion_round_trips_grey() {
        let grey = Color::from_hex("#424242").unwrap();
        let linear = grey.to_linear();
        assert!(linear.x < grey.r);
        assert_eq!(Color::from_linear(linear).to_hex(), "#424242");
    }
}
