use crate::color::{Color, ColorParseError};

/// Session state shared between the colour picker and the scene reconciler.
///
/// Owned by the frame loop and handed out by reference, so the picker writes and the
/// reconciler reads the same value without any global state.
#[derive(Debug)]
pub struct CarContext {
    selected_color: Color,
    picker_visible: bool,
    revision: u64,
}

impl CarContext {
    pub fn new() -> Self {
        Self {
            selected_color: Color::default(),
            picker_visible: false,
            revision: 0,
        }
    }

    pub fn selected_color(&self) -> Color {
        self.selected_color
    }

    /// Bumps the revision only when the colour actually changes.
    pub fn set_color(&mut self, color: Color) {
        if color != self.selected_color {
            self.selected_color = color;
            self.revision += 1;
        }
    }

    pub fn set_color_hex(&mut self, hex: &str) -> Result<(), ColorParseError> {
        let color = Color::from_hex(hex)?;
        self.set_color(color);
        Ok(())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn picker_visible(&self) -> bool {
        self.picker_visible
    }

    pub fn set_picker_visible(&mut self, visible: bool) {
        self.picker_visible = visible;
    }
}

impl Default for CarContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_red_and_hidden() {
        let context = CarContext::new();
        assert_eq!(context.selected_color().to_hex(), "#ff0000");
        assert!(!context.picker_visible());
        assert_eq!(context.revision(), 0);
    }

    #[test]
    fn revision_tracks_real_changes() {
        let mut context = CarContext::new();

        context.set_color(Color::RED);
        assert_eq!(context.revision(), 0);

        context.set_color_hex("#00ff00").unwrap();
        assert_eq!(context.revision(), 1);
        assert_eq!(context.selected_color().to_hex(), "#00ff00");
    }

    #[test]
    fn invalid_hex_keeps_previous_colour() {
        let mut context = CarContext::new();
        assert!(context.set_color_hex("#nope").is_err());
        assert_eq!(context.selected_color(), Color::RED);
        assert_eq!(context.revision(), 0);
    }

    #[test]
    fn picker_visibility_toggles() {
        let mut context = CarContext::new();
        context.set_picker_visible(true);
        assert!(context.picker_visible());
        context.set_picker_visible(false);
        assert!(!context.picker_visible());
    }
}
