use std::time::Duration;

/// Turns variable frame times into a whole number of fixed size physics steps.
pub struct TimeAccumulator {
    accumulated_time: Duration,
    frame_number: u64,
    num_steps: u32,
    max_steps: u32,
    update_rate: Duration,
}

impl TimeAccumulator {
    pub fn new(update_rate: Duration) -> Self {
        TimeAccumulator {
            accumulated_time: Duration::ZERO,
            frame_number: 0,
            num_steps: 0,
            max_steps: 4,
            update_rate,
        }
    }

    pub fn update(&mut self, delta: Duration) {
        self.frame_number += 1;
        self.accumulated_time += delta;
        self.num_steps = (self.accumulated_time.as_nanos() / self.update_rate.as_nanos()) as u32;
        if self.num_steps > self.max_steps {
            tracing::warn!(
                "frame {}: capping physics steps {} from time {} accumulated {} at rate {}",
                self.frame_number,
                self.num_steps,
                delta.as_secs_f64(),
                self.accumulated_time.as_secs_f64(),
                self.update_rate.as_secs_f64(),
            );
            self.accumulated_time = Duration::ZERO;
            self.num_steps = self.max_steps;
        } else {
            self.accumulated_time -= self.update_rate * self.num_steps;
        }
    }

    pub fn step_secs(&self) -> f32 {
        self.update_rate.as_secs_f32()
    }

    pub fn num_steps(&self) -> u32 {
        self.num_steps
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
}
