// Linear velocity ramp generator, advanced once per 1 ms tick

/// Ticks per second, acceleration is given per second
const TICKS_PER_SECOND: i32 = 1000;

/// Acceleration limited velocity trajectory
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRamp {
    /// Requested velocity
    pub target_velocity: i32,
    /// Velocity limit (symmetric)
    pub max_velocity: i32,
    /// Acceleration [velocity units / s]
    pub acceleration: i32,
    /// `false` makes the output follow the target directly
    pub enabled: bool,
    /// Current ramp output
    ramp_velocity: i32,
    /// Acceleration remainder below one velocity unit per tick
    accumulator: i32,
}

impl LinearRamp {
    pub const fn new(max_velocity: i32, acceleration: i32, enabled: bool) -> Self {
        Self {
            target_velocity: 0,
            max_velocity,
            acceleration,
            enabled,
            ramp_velocity: 0,
            accumulator: 0,
        }
    }

    /// Current ramp output
    pub fn ramp_velocity(&self) -> i32 {
        self.ramp_velocity
    }

    /// Advance the ramp by one tick and return the new output
    pub fn compute(&mut self) -> i32 {
        let target = self
            .target_velocity
            .clamp(-self.max_velocity, self.max_velocity);

        if !self.enabled {
            self.ramp_velocity = target;
            self.accumulator = 0;
            return self.ramp_velocity;
        }

        self.accumulator += self.acceleration;
        let step = self.accumulator / TICKS_PER_SECOND;
        self.accumulator %= TICKS_PER_SECOND;

        let diff = target - self.ramp_velocity;
        if diff.abs() <= step {
            self.ramp_velocity = target;
            self.accumulator = 0;
        } else if diff > 0 {
            self.ramp_velocity += step;
        } else {
            self.ramp_velocity -= step;
        }

        self.ramp_velocity = self
            .ramp_velocity
            .clamp(-self.max_velocity, self.max_velocity);
        self.ramp_velocity
    }

    /// Follow an externally measured velocity without ramping
    ///
    /// Keeps the trajectory continuous when velocity control is entered later.
    pub fn track(&mut self, velocity: i32) {
        self.target_velocity = velocity;
        self.ramp_velocity = velocity;
        self.accumulator = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_rate() {
        // 10000 rpm/s = 10 rpm per tick
        let mut ramp = LinearRamp::new(200_000, 10_000, true);
        ramp.target_velocity = 1000;
        for _ in 0..50 {
            ramp.compute();
            assert!(ramp.ramp_velocity() <= 1000);
        }
        assert_eq!(ramp.ramp_velocity(), 500);
    }

    #[test]
    fn test_reaches_target_without_overshoot() {
        let mut ramp = LinearRamp::new(200_000, 30_000, true);
        ramp.target_velocity = 95;
        for _ in 0..10 {
            ramp.compute();
            assert!(ramp.ramp_velocity() <= 95);
        }
        assert_eq!(ramp.ramp_velocity(), 95);
    }

    #[test]
    fn test_fractional_acceleration() {
        // 500 rpm/s = one unit every other tick
        let mut ramp = LinearRamp::new(200_000, 500, true);
        ramp.target_velocity = 100;
        for _ in 0..10 {
            ramp.compute();
        }
        assert_eq!(ramp.ramp_velocity(), 5);
    }

    #[test]
    fn test_decelerates_to_negative() {
        let mut ramp = LinearRamp::new(200_000, 10_000, true);
        ramp.track(100);
        ramp.target_velocity = -100;
        for _ in 0..20 {
            ramp.compute();
        }
        assert_eq!(ramp.ramp_velocity(), -100);
    }

    #[test]
    fn test_disabled_follows_target() {
        let mut ramp = LinearRamp::new(200_000, 10, false);
        ramp.target_velocity = 1234;
        assert_eq!(ramp.compute(), 1234);
    }

    #[test]
    fn test_max_velocity_limit() {
        let mut ramp = LinearRamp::new(1000, 10, false);
        ramp.target_velocity = 5000;
        assert_eq!(ramp.compute(), 1000);
        ramp.target_velocity = -5000;
        assert_eq!(ramp.compute(), -1000);
    }

    #[test]
    fn test_track() {
        let mut ramp = LinearRamp::new(200_000, 10_000, true);
        ramp.target_velocity = 1000;
        for _ in 0..10 {
            ramp.compute();
        }
        ramp.track(42);
        assert_eq!(ramp.ramp_velocity(), 42);
        assert_eq!(ramp.target_velocity, 42);
    }
}
