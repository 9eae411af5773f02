// Host side stand-in for the board, used by the unit tests

use std::collections::HashMap;

use crate::hal::{AnalogInputs, Clock, FlowSample, FlowSensor, FocDriver};
use crate::tmc4671::{DriverMotionMode, Register};

const MOTORS: usize = 4;

pub struct MockHardware {
    registers: HashMap<(usize, u8), i32>,
    /// Last requested motion mode of motor 0
    pub motion_mode: Option<DriverMotionMode>,
    pub motion_mode_requests: u32,
    pub enable_calls: [u32; MOTORS],
    pub disable_calls: [u32; MOTORS],

    pub voltage_raw: u16,
    pub temperature_raw: u16,
    pub pressure_raw: [u16; MOTORS],

    pub flow_present: bool,
    pub flow_raw: u16,
    pub flow_read_fails: bool,
    pub flow_reads: u32,

    pub now_ms: u32,
}

impl MockHardware {
    /// 24.0 V supply, 25 C, zero pressure, no flow sensor
    pub fn new() -> Self {
        Self {
            registers: HashMap::new(),
            motion_mode: None,
            motion_mode_requests: 0,
            enable_calls: [0; MOTORS],
            disable_calls: [0; MOTORS],
            voltage_raw: 2_708,
            temperature_raw: 2_048,
            pressure_raw: [164; MOTORS],
            flow_present: false,
            flow_raw: 32_000,
            flow_read_fails: false,
            flow_reads: 0,
            now_ms: 0,
        }
    }

    /// Register of motor 0
    pub fn register(&self, register: Register) -> i32 {
        self.register_of(0, register)
    }

    pub fn register_of(&self, motor: usize, register: Register) -> i32 {
        self.registers
            .get(&(motor, register.address()))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_register(&mut self, motor: usize, register: Register, value: i32) {
        self.registers.insert((motor, register.address()), value);
    }
}

impl FocDriver for MockHardware {
    fn read_int(&mut self, motor: usize, register: Register) -> i32 {
        self.register_of(motor, register)
    }

    fn write_int(&mut self, motor: usize, register: Register, value: i32) {
        self.set_register(motor, register, value);
    }

    fn switch_to_motion_mode(&mut self, motor: usize, mode: DriverMotionMode) {
        self.motion_mode_requests += 1;
        if motor == 0 {
            self.motion_mode = Some(mode);
        }
        self.set_register(motor, Register::ModeRampModeMotion, mode as i32);
    }

    fn enable_driver(&mut self, motor: usize) {
        self.enable_calls[motor] += 1;
    }

    fn disable_driver(&mut self, motor: usize) {
        self.disable_calls[motor] += 1;
    }
}

impl AnalogInputs for MockHardware {
    fn supply_voltage_raw(&mut self) -> u16 {
        self.voltage_raw
    }

    fn motor_temperature_raw(&mut self) -> u16 {
        self.temperature_raw
    }

    fn pressure_raw(&mut self, motor: usize) -> u16 {
        self.pressure_raw[motor]
    }
}

impl FlowSensor for MockHardware {
    fn probe(&mut self) -> bool {
        self.flow_present
    }

    fn read(&mut self) -> Option<FlowSample> {
        self.flow_reads += 1;
        if self.flow_read_fails {
            return None;
        }
        Some(FlowSample {
            raw: self.flow_raw,
            status: 0,
        })
    }
}

impl Clock for MockHardware {
    fn now_ms(&self) -> u32 {
        self.now_ms
    }
}
