use imgui::{Condition, Key};

use crate::{
    car_context::CarContext,
    color::{Color, ColorParseError},
    configurator::{ConfiguratorState, LoadingState},
};

const PICKER_WINDOW_WIDTH: f32 = 260.0;
const PICKER_POSITION: [f32; 2] = [20.0, 20.0];

/// Overlay state that has to outlive a single frame.
#[derive(Default)]
pub struct Overlay {
    hex_input: HexInput,
}

impl Overlay {
    pub fn draw(&mut self, state: &mut ConfiguratorState, ui: &imgui::Ui) {
        handle_shortcuts(&mut state.context, ui);

        match state.loading_state() {
            LoadingState::Ready => {}
            loading => draw_loading_overlay(&loading, ui),
        }

        draw_color_picker(&mut state.context, &mut self.hex_input, ui);
        state.materials.draw_ui(ui);
    }
}

/// Text buffer behind the hex field. Follows the selected colour until the user edits it.
#[derive(Default)]
struct HexInput {
    text: String,
    synced_revision: Option<u64>,
    error: Option<ColorParseError>,
}

impl HexInput {
    fn sync(&mut self, context: &CarContext) {
        if self.synced_revision != Some(context.revision()) {
            self.text = context.selected_color().to_hex();
            self.synced_revision = Some(context.revision());
            self.error = None;
        }
    }

    fn submit(&mut self, context: &mut CarContext) {
        match context.set_color_hex(self.text.trim()) {
            Ok(()) => {
                // Resync so "#F00" reads back as "#ff0000"
                self.synced_revision = None;
                self.error = None;
            }
            Err(error) => {
                log::warn!("Ignoring paint colour: {}", error);
                self.error = Some(error);
            }
        }
    }
}

fn handle_shortcuts(context: &mut CarContext, ui: &imgui::Ui) {
    if ui.io().want_text_input {
        return;
    }

    if ui.is_key_pressed_no_repeat(Key::P) {
        context.set_picker_visible(!context.picker_visible());
    }
}

fn draw_loading_overlay(loading: &LoadingState, ui: &imgui::Ui) {
    let [width, height] = ui.io().display_size;

    ui.window("Loading")
        .position([width * 0.5, height * 0.5], Condition::Always)
        .position_pivot([0.5, 0.5])
        .always_auto_resize(true)
        .no_decoration()
        .movable(false)
        .build(|| match loading {
            LoadingState::Loading { path, elapsed } => {
                ui.text(format!("Loading {}...", path.display()));
                ui.text_disabled(format!("{:.1}s", elapsed.as_secs_f32()));
            }
            LoadingState::Failed(error) => {
                ui.text_colored([1.0, 0.4, 0.4, 1.0], "Failed to load the car");
                ui.text_wrapped(error);
            }
            LoadingState::Ready => {}
        });
}

fn draw_color_picker(context: &mut CarContext, hex_input: &mut HexInput, ui: &imgui::Ui) {
    if !context.picker_visible() {
        return;
    }

    let mut visible = true;

    ui.window("Paint")
        .position(PICKER_POSITION, Condition::FirstUseEver)
        .size([PICKER_WINDOW_WIDTH, 0.0], Condition::FirstUseEver)
        .always_auto_resize(true)
        .opened(&mut visible)
        .build(|| {
            let mut value: [f32; 3] = context.selected_color().into();
            if ui.color_picker3("##paint", &mut value) {
                context.set_color(Color::from(value));
            }

            hex_input.sync(context);
            if ui
                .input_text("Colour", &mut hex_input.text)
                .enter_returns_true(true)
                .build()
            {
                hex_input.submit(context);
            }

            if let Some(error) = &hex_input.error {
                ui.text_colored([1.0, 0.4, 0.4, 1.0], error.to_string());
            }

            ui.text_disabled("Press P to toggle");

            if ui.button("Hide picker") {
                context.set_picker_visible(false);
            }
        });

    if !visible {
        context.set_picker_visible(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_field_follows_the_selected_colour() {
        let mut context = CarContext::new();
        let mut input = HexInput::default();

        input.sync(&context);
        assert_eq!(input.text, "#ff0000");

        context.set_color(Color::rgb(0.0, 0.0, 1.0));
        input.sync(&context);
        assert_eq!(input.text, "#0000ff");
    }

    #[test]
    fn submitted_hex_sets_the_paint() {
        let mut context = CarContext::new();
        let mut input = HexInput::default();
        input.sync(&context);

        input.text = " #0F0 ".to_string();
        input.submit(&mut context);
        input.sync(&context);

        assert_eq!(context.selected_color().to_hex(), "#00ff00");
        assert_eq!(context.revision(), 1);
        assert_eq!(input.text, "#00ff00");
        assert!(input.error.is_none());
    }

    #[test]
    fn malformed_hex_keeps_the_paint_and_the_typed_text() {
        let mut context = CarContext::new();
        let mut input = HexInput::default();
        input.sync(&context);

        input.text = "#12345".to_string();
        input.submit(&mut context);
        input.sync(&context);

        assert_eq!(context.selected_color().to_hex(), "#ff0000");
        assert_eq!(context.revision(), 0);
        assert_eq!(input.text, "#12345");
        assert!(matches!(
            input.error,
            Some(ColorParseError::InvalidLength(_))
        ));
    }

    #[test]
    fn picker_sits_in_the_top_left_corner() {
        assert_eq!(PICKER_POSITION, [20.0, 20.0]);
    }
}
