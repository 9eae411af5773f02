//! Blower regulation core
//!
//! Per-millisecond regulation of a TMC4671 driven blower: torque, velocity,
//! pressure and volume objectives on top of open-loop or hall commutation,
//! guarded by supply voltage and motor temperature monitoring.
//!
//! The crate is `no_std` and talks to the board only through the traits in
//! [`hal`]. The firmware owns a [`Controller`] and calls
//! [`Controller::process_tick`] at least once per millisecond.

#![cfg_attr(not(test), no_std)]

// This must go first so the macros are visible to every other module
mod fmt;

pub mod config;
pub mod controller;
pub mod error;
pub mod flow;
pub mod hal;
pub mod mode;
pub mod pi;
pub mod pt1;
pub mod ramp;
pub mod safety;
pub mod tmc4671;

#[cfg(test)]
mod mock;

pub use config::{CommutationMode, HallConfig, MotorConfig, ShaftDirection};
pub use controller::{Controller, MotorChannel};
pub use error::ParamError;
pub use hal::{AnalogInputs, Clock, FlowSample, FlowSensor, FocDriver, Hardware};
pub use mode::{MotionMode, RegulationState};
