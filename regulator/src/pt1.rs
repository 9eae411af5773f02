// PT1 (first order) low-pass filter in fixed point

/// Filter tuning: `weight / (1 << shift)` is the per-tick smoothing factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pt1Params {
    pub weight: i32,
    pub shift: u8,
}

impl Pt1Params {
    pub const fn new(weight: i32, shift: u8) -> Self {
        Self { weight, shift }
    }
}

/// Exponential moving average with a wide accumulator
///
/// `accumulator += (sample - output) * weight; output = accumulator >> shift`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pt1Filter {
    /// Sub-integer accumulator, scaled by `1 << shift`
    accumulator: i64,
    /// Last filtered value
    output: i32,
}

impl Pt1Filter {
    pub const fn new() -> Self {
        Self {
            accumulator: 0,
            output: 0,
        }
    }

    /// Feed one sample and return the new filtered value
    pub fn update(&mut self, sample: i32, params: Pt1Params) -> i32 {
        self.accumulator += (sample as i64 - self.output as i64) * params.weight as i64;
        self.output = (self.accumulator >> params.shift) as i32;
        self.output
    }

    /// Last filtered value
    pub fn output(&self) -> i32 {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: Pt1Params = Pt1Params::new(16, 8);

    #[test]
    fn test_converges_without_overshoot() {
        let mut filter = Pt1Filter::new();
        let mut last = 0;
        for _ in 0..2000 {
            let out = filter.update(1000, PARAMS);
            assert!(out >= last);
            assert!(out <= 1000);
            last = out;
        }
        assert_eq!(filter.output(), 1000);
    }

    #[test]
    fn test_negative_input() {
        let mut filter = Pt1Filter::new();
        let mut last = 0;
        for _ in 0..2000 {
            let out = filter.update(-750, PARAMS);
            assert!(out <= last);
            assert!(out >= -750);
            last = out;
        }
        assert_eq!(filter.output(), -750);
    }

    #[test]
    fn test_first_step() {
        // 1/16 of the step after one tick
        let mut filter = Pt1Filter::new();
        assert_eq!(filter.update(1600, PARAMS), 100);
    }
}
