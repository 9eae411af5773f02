// Fixed point PI controller with output aware anti-windup

/// Fixed divisors of one PI instantiation
///
/// `output = Kp * error / p_divisor + Ki * error_sum / i_divisor`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PiScale {
    pub p_divisor: i64,
    pub i_divisor: i64,
}

/// Pressure [Pa] -> target torque [mA]
pub const PRESSURE_PI_SCALE: PiScale = PiScale {
    p_divisor: 256,
    i_divisor: 65_536,
};

/// Volume [ml] -> target pressure [Pa]
pub const VOLUME_PI_SCALE: PiScale = PiScale {
    p_divisor: 256,
    i_divisor: 131_072,
};

/// Inclusive range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: i32,
    pub max: i32,
}

impl Limits {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }
}

/// PI controller state
#[derive(Debug, Clone, Copy, Default)]
pub struct PiControl {
    /// Proportional gain, reloaded from the motor config every tick
    pub p_gain: i32,
    /// Integral gain, reloaded from the motor config every tick
    pub i_gain: i32,
    /// Raw integrator (sum of unscaled errors)
    error_sum: i64,
}

impl PiControl {
    pub const fn new() -> Self {
        Self {
            p_gain: 0,
            i_gain: 0,
            error_sum: 0,
        }
    }

    /// Load gains for this tick
    pub fn set_gains(&mut self, p_gain: u16, i_gain: u16) {
        self.p_gain = p_gain as i32;
        self.i_gain = i_gain as i32;
    }

    /// Run one controller step
    ///
    /// # Arguments
    /// * `target` - Desired value, clamped into `target_range` first
    /// * `actual` - Measured value
    /// * `target_range` - Physically valid target range
    /// * `output` - Achievable output range for this tick
    /// * `scale` - Fixed divisors of this instantiation
    pub fn compute(
        &mut self,
        target: i32,
        actual: i32,
        target_range: Limits,
        output: Limits,
        scale: PiScale,
    ) -> i32 {
        let target = target.clamp(target_range.min, target_range.max);

        let error = target - actual;
        self.error_sum += error as i64;

        // Bound the integrator to the window in which the integral term alone
        // spans [min, max] for the current gain. Gains and limits change live,
        // so the window is rebuilt every tick.
        if self.i_gain > 0 {
            let ki = self.i_gain as i64;
            let sum_min = (output.min as i64 * scale.i_divisor) / ki;
            let sum_max = (output.max as i64 * scale.i_divisor) / ki;
            self.error_sum = self.error_sum.clamp(sum_min, sum_max);
        } else {
            self.error_sum = 0;
        }

        let p_term = (self.p_gain as i64 * error as i64) / scale.p_divisor;
        let i_term = (self.i_gain as i64 * self.error_sum) / scale.i_divisor;

        (p_term + i_term).clamp(output.min as i64, output.max as i64) as i32
    }

    pub fn error_sum(&self) -> i64 {
        self.error_sum
    }

    pub fn reset(&mut self) {
        self.error_sum = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNBOUNDED: Limits = Limits::new(i32::MIN, i32::MAX);

    fn controller(p_gain: u16, i_gain: u16) -> PiControl {
        let mut pi = PiControl::new();
        pi.set_gains(p_gain, i_gain);
        pi
    }

    #[test]
    fn test_proportional_only() {
        let mut pi = controller(512, 0);
        let out = pi.compute(1000, 0, UNBOUNDED, Limits::new(-5000, 5000), PRESSURE_PI_SCALE);
        assert_eq!(out, 2000);
        assert_eq!(pi.error_sum(), 0);
    }

    #[test]
    fn test_truncates_toward_zero() {
        let mut pi = controller(1, 0);
        let out = pi.compute(0, 300, UNBOUNDED, Limits::new(-5000, 5000), PRESSURE_PI_SCALE);
        // -300 / 256 = -1 (not -2)
        assert_eq!(out, -1);
    }

    #[test]
    fn test_output_limiting() {
        let mut pi = controller(512, 0);
        let out = pi.compute(10_000, 0, UNBOUNDED, Limits::new(-1000, 1000), PRESSURE_PI_SCALE);
        assert_eq!(out, 1000);
    }

    #[test]
    fn test_target_clamped_before_error() {
        let mut pi = controller(256, 10);
        let out = pi.compute(-500, 0, Limits::new(0, 6000), Limits::new(-5000, 5000), PRESSURE_PI_SCALE);
        assert_eq!(out, 0);
        assert_eq!(pi.error_sum(), 0);
    }

    #[test]
    fn test_integral_monotonic_until_saturation() {
        let mut pi = controller(0, 100);
        let limits = Limits::new(-2000, 2000);
        let bound = (2000i64 * PRESSURE_PI_SCALE.i_divisor) / 100;
        let mut last = 0;
        for _ in 0..5000 {
            let out = pi.compute(1000, 0, UNBOUNDED, limits, PRESSURE_PI_SCALE);
            assert!(out >= last);
            assert!(pi.error_sum() <= bound);
            last = out;
        }
        assert_eq!(last, 2000);
        assert_eq!(pi.error_sum(), bound);
    }

    #[test]
    fn test_gain_change_removes_stale_windup() {
        let mut pi = controller(0, 100);
        let limits = Limits::new(0, 2000);
        for _ in 0..5000 {
            pi.compute(1000, 0, UNBOUNDED, limits, PRESSURE_PI_SCALE);
        }
        // Doubling Ki halves the reachable window immediately
        pi.set_gains(0, 200);
        let out = pi.compute(1000, 1000, UNBOUNDED, limits, PRESSURE_PI_SCALE);
        assert_eq!(pi.error_sum(), (2000i64 * PRESSURE_PI_SCALE.i_divisor) / 200);
        assert_eq!(out, 2000);
    }

    #[test]
    fn test_lower_bound_follows_min_output() {
        let mut pi = controller(0, 100);
        for _ in 0..100 {
            pi.compute(0, 1000, UNBOUNDED, Limits::new(-2000, 2000), PRESSURE_PI_SCALE);
        }
        assert!(pi.error_sum() < 0);
        // Negative output no longer allowed: the sum is pulled up to zero
        let out = pi.compute(0, 1000, UNBOUNDED, Limits::new(0, 2000), PRESSURE_PI_SCALE);
        assert_eq!(pi.error_sum(), 0);
        assert_eq!(out, 0);
    }

    #[test]
    fn test_reset() {
        let mut pi = controller(256, 100);
        pi.compute(100, 0, UNBOUNDED, Limits::new(-5000, 5000), VOLUME_PI_SCALE);
        assert!(pi.error_sum() > 0);
        pi.reset();
        assert_eq!(pi.error_sum(), 0);
    }
}
