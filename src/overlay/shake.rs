use super::*;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_BOOST: f32 = 2.0;

/// Screen-shake state for the overlay. `tick` rolls a fresh random offset
/// each frame and decays the boost; `offset` is then stable for the rest
/// of that frame so layout and hit-testing agree.
pub struct ShakeEffect {
    boost: f32,
    offset: (f32, f32),
    rng: StdRng,
}

impl ShakeEffect {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            boost: 0.0,
            offset: (0.0, 0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn boost(&mut self, delta: f32) {
        self.boost = (self.boost + delta.max(0.0)).min(MAX_BOOST);
    }

    pub fn power(&self) -> f32 {
        self.boost
    }

    /// Advance by `dt` ticks: decay the boost by half per tick and roll
    /// the offset for the coming frame.
    pub fn tick(&mut self, dt: f32, force: f32) {
        self.boost = lerp(self.boost, 0.0, 1.0 - 0.5f32.powf(dt));
        if self.boost < 0.01 {
            self.boost = 0.0;
        }
        let amplitude = self.boost * force;
        if amplitude <= 0.0 {
            self.offset = (0.0, 0.0);
        } else {
            self.offset = (
                self.rng.gen_range(-1.0f32..=1.0) * amplitude,
                self.rng.gen_range(-1.0f32..=1.0) * amplitude,
            );
        }
    }

    pub fn offset(&self) -> (f32, f32) {
        self.offset
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}
