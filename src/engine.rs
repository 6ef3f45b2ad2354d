use crate::{configurator::ConfiguratorState, rendering::renderer::Renderer, ui::Overlay};

pub fn update(
    state: &mut ConfiguratorState,
    overlay: &mut Overlay,
    _renderer: &mut Renderer,
    ui: &mut imgui::Ui,
) -> anyhow::Result<()> {
    overlay.draw(state, ui);

    state.update();
    state.scene.late_update();

    Ok(())
}
