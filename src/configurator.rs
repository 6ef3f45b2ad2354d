use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use glam::Vec3;

use crate::{
    asset_loader::{AssetLoader, LoadStatus},
    camera::Camera,
    car::{CarLayout, FrameAnimator, SceneReconciler},
    car_context::CarContext,
    clock::AnimationClock,
    error::ConfiguratorError,
    material_manager::MaterialManager,
    orbit_controls::{OrbitConfig, OrbitControls},
    rendering::config::RenderConfig,
    scene_graph::{Object3D, ObjectId, Scene, Transform},
};

/// What the loading overlay should show.
pub enum LoadingState<'a> {
    Loading { path: &'a Path, elapsed: Duration },
    Failed(&'a str),
    Ready,
}

/// Everything the frame loop owns besides the GPU: the scene, the colour the user
/// picked and the machinery that keeps the two in sync.
pub struct ConfiguratorState {
    pub camera: Camera,
    pub orbit: OrbitControls,
    pub clock: AnimationClock,
    pub scene: Scene,
    pub materials: MaterialManager,
    pub context: CarContext,
    pub render_config: RenderConfig,
    layout: CarLayout,
    reconciler: Option<SceneReconciler>,
    animator: FrameAnimator,
    loader: Option<AssetLoader>,
    load_error: Option<String>,
    ground: ObjectId,
    last_reconciled_revision: Option<u64>,
}

impl ConfiguratorState {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        let camera = Camera::default();
        let orbit = OrbitControls::new(OrbitConfig::default(), &camera);

        let mut scene = Scene::new();
        let ground = scene.add_child(
            scene.root(),
            Object3D::group("Ground", Transform::default()),
        );

        Self {
            camera,
            orbit,
            clock: AnimationClock::new(),
            scene,
            materials: MaterialManager::new(),
            context: CarContext::new(),
            render_config: RenderConfig::default(),
            layout: CarLayout::default(),
            reconciler: None,
            animator: FrameAnimator::default(),
            loader: Some(AssetLoader::spawn(model_path)),
            load_error: None,
            ground,
            last_reconciled_revision: None,
        }
    }

    pub fn loading_state(&self) -> LoadingState<'_> {
        if let Some(error) = &self.load_error {
            return LoadingState::Failed(error);
        }

        match &self.loader {
            Some(loader) => LoadingState::Loading {
                path: loader.path(),
                elapsed: loader.elapsed(),
            },
            None => LoadingState::Ready,
        }
    }

    /// Current translation of the ground pivot. The grid pattern follows it.
    pub fn ground_offset(&self) -> Vec3 {
        self.scene
            .get_object_transform(self.ground)
            .map(|transform| transform.translation())
            .unwrap_or(Vec3::ZERO)
    }

    pub fn update(&mut self) {
        self.poll_loader();
        self.reconcile_if_changed();
        self.animate();
        self.orbit.update(&mut self.camera);
    }

    fn poll_loader(&mut self) {
        let Some(loader) = &self.loader else {
            return;
        };

        match loader.poll() {
            LoadStatus::Pending => {}
            LoadStatus::Ready(asset) => {
                self.loader = None;

                let root = self.scene.root();
                match asset.spawn_into(&mut self.scene, &mut self.materials, root) {
                    Ok(model_root) => self.on_model_ready(model_root),
                    Err(error) => {
                        log::error!("Failed to build the car scene: {:?}", error);
                        self.load_error = Some(format!("{:#}", error));
                    }
                }
            }
            LoadStatus::Failed(error) => {
                self.loader = None;
                log::error!("Failed to load the car model: {:?}", error);
                self.load_error = Some(format!("{:#}", error));
            }
        }
    }

    /// A model the configurator can't dress is reported like a failed load and the
    /// picker stays hidden.
    fn on_model_ready(&mut self, model_root: ObjectId) {
        self.reconciler = Some(SceneReconciler::new(self.layout.clone(), model_root));

        match self.reconcile() {
            Ok(()) => self.context.set_picker_visible(true),
            Err(error) => {
                self.reconciler = None;
                self.load_error = Some(format!("Unsupported car model: {}", error));
            }
        }
    }

    fn reconcile_if_changed(&mut self) {
        if self.reconciler.is_none() {
            return;
        }

        if self.last_reconciled_revision != Some(self.context.revision()) {
            // Errors are logged; the last good state stays on screen
            let _ = self.reconcile();
        }
    }

    fn reconcile(&mut self) -> Result<(), ConfiguratorError> {
        let Some(reconciler) = &mut self.reconciler else {
            return Err(ConfiguratorError::NotReady);
        };

        // A failed pass is not retried until the colour changes again
        self.last_reconciled_revision = Some(self.context.revision());

        let color = self.context.selected_color();
        match reconciler.reconcile(&mut self.scene, &mut self.materials, color) {
            Ok(_) => {
                log::debug!("Reconciled with paint {}", color.to_hex());
                Ok(())
            }
            Err(error) => {
                log::error!("Reconciliation failed: {}", error);
                Err(error)
            }
        }
    }

    fn animate(&mut self) {
        let elapsed = self.clock.tick();
        let wheel_pivots = self
            .reconciler
            .as_ref()
            .and_then(|reconciler| reconciler.rig())
            .map(|rig| rig.pivots());

        match self
            .animator
            .advance(&mut self.scene, elapsed, wheel_pivots, Some(self.ground))
        {
            Ok(()) => {}
            Err(ConfiguratorError::NotReady) => log::trace!("Skipping animation, car not ready"),
            Err(error) => log::error!("Animation failed: {}", error),
        }
    }
}
