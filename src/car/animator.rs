use glam::{Quat, Vec3};

use crate::{
    error::ConfiguratorError,
    scene_graph::{ObjectId, Scene},
};

#[derive(Debug, Clone)]
pub struct AnimationConfig {
    /// Wheel spin in radians per second.
    pub rotation_rate: f32,
    /// Seconds per unit of ground travel.
    pub scroll_divisor: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            rotation_rate: 1.9,
            scroll_divisor: 1.3,
        }
    }
}

/// Spins the wheels and scrolls the ground so the parked car looks like it's driving.
/// Every transform is a function of elapsed time alone.
pub struct FrameAnimator {
    config: AnimationConfig,
}

impl FrameAnimator {
    pub fn new(config: AnimationConfig) -> Self {
        Self { config }
    }

    pub fn wheel_angle(&self, elapsed: f32) -> f32 {
        elapsed * self.config.rotation_rate
    }

    pub fn ground_offset(&self, elapsed: f32) -> f32 {
        -elapsed / self.config.scroll_divisor
    }

    /// Skips the whole frame with `NotReady` if any pivot is missing, so wheels and
    /// ground never get out of step.
    pub fn advance(
        &self,
        scene: &mut Scene,
        elapsed: f32,
        wheel_pivots: Option<[ObjectId; 4]>,
        ground_pivot: Option<ObjectId>,
    ) -> Result<(), ConfiguratorError> {
        let (Some(wheel_pivots), Some(ground_pivot)) = (wheel_pivots, ground_pivot) else {
            return Err(ConfiguratorError::NotReady);
        };

        let all_present = wheel_pivots
            .iter()
            .chain(std::iter::once(&ground_pivot))
            .all(|id| scene.get_object(*id).is_some());
        if !all_present {
            return Err(ConfiguratorError::NotReady);
        }

        let rotation = Quat::from_rotation_x(self.wheel_angle(elapsed));
        for pivot in wheel_pivots {
            scene.set_object_rotation(pivot, rotation);
        }

        let ground = scene
            .get_object_transform(ground_pivot)
            .map(|transform| transform.translation())
            .unwrap_or(Vec3::ZERO);
        scene.set_object_translation(
            ground_pivot,
            Vec3::new(ground.x, ground.y, self.ground_offset(elapsed)),
        );

        Ok(())
    }
}

impl Default for FrameAnimator {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}
