use std::time::Instant;

/// Monotonic elapsed-time source for the frame animator.
#[derive(Debug)]
pub struct AnimationClock {
    start: Instant,
    last_elapsed: f32,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last_elapsed: 0.0,
        }
    }

    /// Samples the clock. Never returns less than a previous sample.
    pub fn tick(&mut self) -> f32 {
        let elapsed = self.start.elapsed().as_secs_f32();
        self.last_elapsed = self.last_elapsed.max(elapsed);
        self.last_elapsed
    }

    /// Last sampled value, without advancing.
    pub fn elapsed(&self) -> f32 {
        self.last_elapsed
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn clock_advances() {
        let mut clock = AnimationClock::new();

        thread::sleep(Duration::from_millis(10));
        let elapsed = clock.tick();

        assert!(elapsed >= 0.009);
        assert_eq!(clock.elapsed(), elapsed);
    }

    #[test]
    fn clock_never_rewinds() {
        let mut clock = AnimationClock::new();

        let mut previous = clock.tick();
        for _ in 0..100 {
            let next = clock.tick();
            assert!(next >= previous);
            previous = next;
        }
    }
}
