use std::time::{Duration, Instant};

/// Most steps run per `tick`; the rest of a long stall is dropped.
const MAX_STEPS_PER_TICK: u32 = 8;

/// Fixed-step driver for the scene animation.
pub struct GameLoop {
    last_update: Instant,
    accumulator: Duration,
    fixed_timestep: Duration,
}

impl GameLoop {
    pub fn new(steps_per_second: u32) -> Self {
        Self {
            last_update: Instant::now(),
            accumulator: Duration::ZERO,
            fixed_timestep: Duration::from_secs_f64(1.0 / steps_per_second.max(1) as f64),
        }
    }

    /// Runs `update_fn` once per elapsed step and returns how many ran.
    pub fn tick<F>(&mut self, update_fn: F) -> u32
    where
        F: FnMut(f32),
    {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update);
        self.last_update = now;
        self.advance(elapsed, update_fn)
    }

    /// `tick` with an explicit frame time.
    pub fn advance<F>(&mut self, elapsed: Duration, mut update_fn: F) -> u32
    where
        F: FnMut(f32),
    {
        self.accumulator += elapsed;

        let dt = self.fixed_timestep.as_secs_f32();
        let mut steps = 0;
        while self.accumulator >= self.fixed_timestep {
            self.accumulator -= self.fixed_timestep;
            if steps < MAX_STEPS_PER_TICK {
                update_fn(dt);
                steps += 1;
            }
        }
        steps
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new(60)
    }
}
