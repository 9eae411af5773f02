//! Hardware contracts consumed by the regulation core
//!
//! The firmware implements these over SPI / ADC / I2C. Host tests use
//! `crate::mock::MockHardware`.

use crate::tmc4671::{DriverMotionMode, Field, Register};

/// FOC driver register interface (TMC4671 + TMC6100 gate driver)
pub trait FocDriver {
    /// Read a full 32 bit register
    fn read_int(&mut self, motor: usize, register: Register) -> i32;

    /// Write a full 32 bit register
    fn write_int(&mut self, motor: usize, register: Register, value: i32);

    /// Select the electrical motion mode of the driver
    fn switch_to_motion_mode(&mut self, motor: usize, mode: DriverMotionMode);

    /// Enable the power stage
    fn enable_driver(&mut self, motor: usize);

    /// Disable the power stage
    fn disable_driver(&mut self, motor: usize);

    /// Read a single field, sign extended for signed fields
    fn read_field(&mut self, motor: usize, field: Field) -> i32 {
        let raw = self.read_int(motor, field.register);
        field.extract(raw)
    }

    /// Masked read-modify-write of a single field
    fn write_field(&mut self, motor: usize, field: Field, value: i32) {
        let raw = self.read_int(motor, field.register);
        self.write_int(motor, field.register, field.insert(raw, value));
    }
}

/// Raw 12 bit ADC samples
pub trait AnalogInputs {
    fn supply_voltage_raw(&mut self) -> u16;
    fn motor_temperature_raw(&mut self) -> u16;
    fn pressure_raw(&mut self, motor: usize) -> u16;
}

/// One flow sensor transaction result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSample {
    /// Raw flow count
    pub raw: u16,
    /// Status / checksum word, currently not evaluated
    pub status: u16,
}

/// Flow sensor bus interface
pub trait FlowSensor {
    /// Write-only presence probe, `true` when the sensor acknowledged
    fn probe(&mut self) -> bool;

    /// Write-then-read transaction, `None` on bus error
    fn read(&mut self) -> Option<FlowSample>;
}

/// Monotonic millisecond counter
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Everything the controller needs from the board
pub trait Hardware: FocDriver + AnalogInputs + FlowSensor + Clock {}

impl<T> Hardware for T where T: FocDriver + AnalogInputs + FlowSensor + Clock {}
