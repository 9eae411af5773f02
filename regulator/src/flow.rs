// Flow measurement and volume integration (single I2C flow meter shared by all motors)

use crate::config::{filter, flow};
use crate::hal::{FlowSample, FlowSensor};
use crate::pt1::Pt1Filter;

/// Convert a raw sensor count to ml/min
pub fn raw_to_flow(raw: u16) -> i32 {
    ((raw as i32 - flow::SENSOR_OFFSET) * flow::ML_PER_LITER) / flow::SCALE_FACTOR
}

/// Flow meter state and integrated volume
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowVolume {
    /// Sensor acknowledged the probe at init
    present: bool,
    /// Zero point [ml/min]
    offset: i32,
    /// Last uncorrected flow [ml/min]
    raw_flow: i32,
    /// Last offset corrected flow [ml/min]
    flow: i32,
    filter: Pt1Filter,
    /// Integrated flow [ml/min * ms]
    sum: i64,
    /// Integrated volume [ml]
    volume: i32,
}

impl FlowVolume {
    pub const fn new() -> Self {
        Self {
            present: false,
            offset: 0,
            raw_flow: 0,
            flow: 0,
            filter: Pt1Filter::new(),
            sum: 0,
            volume: 0,
        }
    }

    /// Probe the sensor and clear all state
    pub fn init<S: FlowSensor>(&mut self, sensor: &mut S) {
        *self = Self::new();
        self.present = sensor.probe();
        if self.present {
            info!("flow sensor detected");
        } else {
            warn!("flow sensor not found, volume integration disabled");
        }
    }

    /// Sample once and integrate (one call per 1 ms tick)
    pub fn update<S: FlowSensor>(&mut self, sensor: &mut S) {
        if !self.present {
            return;
        }
        // Bus errors skip the tick
        let Some(FlowSample { raw, .. }) = sensor.read() else {
            return;
        };

        self.raw_flow = raw_to_flow(raw);
        self.flow = self.raw_flow - self.offset;
        self.filter.update(self.flow, filter::FLOW);

        self.sum += self.flow as i64;
        self.volume = (self.sum / flow::MS_PER_MINUTE) as i32;
    }

    /// Use the current flow as the new zero point
    pub fn zero_flow(&mut self) {
        self.offset = self.raw_flow;
        info!("flow offset set to {} ml/min", self.offset);
    }

    pub fn reset_volume_integration(&mut self) {
        self.sum = 0;
        self.volume = 0;
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Filtered, offset corrected flow [ml/min]
    pub fn flow_value(&self) -> i32 {
        self.filter.output()
    }

    pub fn flow_offset(&self) -> i32 {
        self.offset
    }

    /// Integrated volume [ml]
    pub fn volume(&self) -> i32 {
        self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHardware;

    /// Raw count for a flow in ml/min (exact for multiples of 1000/140)
    fn raw_for(ml_per_min: i32) -> u16 {
        (ml_per_min * flow::SCALE_FACTOR / flow::ML_PER_LITER + flow::SENSOR_OFFSET) as u16
    }

    fn present() -> (MockHardware, FlowVolume) {
        let mut hw = MockHardware::new();
        hw.flow_present = true;
        let mut integrator = FlowVolume::new();
        integrator.init(&mut hw);
        (hw, integrator)
    }

    #[test]
    fn test_conversion() {
        assert_eq!(raw_to_flow(32_000), 0);
        assert_eq!(raw_to_flow(32_140), 1_000);
        assert_eq!(raw_to_flow(31_860), -1_000);
    }

    #[test]
    fn test_one_liter_per_minute_for_one_minute() {
        let (mut hw, mut integrator) = present();
        hw.flow_raw = raw_for(1_000);
        for _ in 0..60_000 {
            integrator.update(&mut hw);
        }
        assert_eq!(integrator.volume(), 1_000);
    }

    #[test]
    fn test_sixty_liters_per_minute_for_one_second() {
        let (mut hw, mut integrator) = present();
        hw.flow_raw = raw_for(60_000);
        for _ in 0..1_000 {
            integrator.update(&mut hw);
        }
        assert_eq!(integrator.volume(), 1_000);
    }

    #[test]
    fn test_zero_flow_and_reset() {
        let (mut hw, mut integrator) = present();
        hw.flow_raw = raw_for(5_000);
        for _ in 0..120 {
            integrator.update(&mut hw);
        }
        assert_eq!(integrator.volume(), 10);

        integrator.zero_flow();
        assert_eq!(integrator.flow_offset(), 5_000);
        integrator.reset_volume_integration();
        assert_eq!(integrator.volume(), 0);

        for _ in 0..1_000 {
            integrator.update(&mut hw);
        }
        assert_eq!(integrator.volume(), 0);
    }

    #[test]
    fn test_filtered_flow_value() {
        let (mut hw, mut integrator) = present();
        hw.flow_raw = raw_for(1_000);
        integrator.update(&mut hw);
        // 32/256 of the step
        assert_eq!(integrator.flow_value(), 125);
        for _ in 0..2_000 {
            integrator.update(&mut hw);
        }
        assert_eq!(integrator.flow_value(), 1_000);
    }

    #[test]
    fn test_read_failure_skips_tick() {
        let (mut hw, mut integrator) = present();
        hw.flow_raw = raw_for(60_000);
        for _ in 0..500 {
            integrator.update(&mut hw);
        }
        hw.flow_read_fails = true;
        for _ in 0..500 {
            integrator.update(&mut hw);
        }
        assert_eq!(integrator.volume(), 500);
    }

    #[test]
    fn test_absent_sensor_is_noop() {
        let mut hw = MockHardware::new();
        hw.flow_present = false;
        hw.flow_raw = raw_for(60_000);
        let mut integrator = FlowVolume::new();
        integrator.init(&mut hw);
        assert!(!integrator.is_present());

        for _ in 0..1_000 {
            integrator.update(&mut hw);
        }
        assert_eq!(integrator.volume(), 0);
        assert_eq!(hw.flow_reads, 0);
    }
}
