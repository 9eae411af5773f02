//! 制御コア向けボード抽象
//!
//! TMC4671・ADC・流量センサ・時刻をまとめ、制御コアのハードウェアトレイトを実装します。

use blower_regulator::tmc4671::{DriverMotionMode, Register};
use blower_regulator::{AnalogInputs, Clock, FlowSample, FlowSensor, FocDriver};
use embassy_stm32::adc::{Adc, AnyAdcChannel};
use embassy_stm32::peripherals;
use embassy_time::Instant;

use crate::flow_sensor::FlowMeter;
use crate::tmc4671::Tmc4671;

/// アナログ入力
pub struct AnalogFrontEnd {
    pub adc1: Adc<'static, peripherals::ADC1>,
    pub adc2: Adc<'static, peripherals::ADC2>,
    /// 電源電圧（ADC2）
    pub supply_voltage: AnyAdcChannel<peripherals::ADC2>,
    /// サーミスタ（ADC1）
    pub motor_temperature: AnyAdcChannel<peripherals::ADC1>,
    /// 圧力センサ（ADC1）
    pub pressure: AnyAdcChannel<peripherals::ADC1>,
}

pub struct Board {
    driver: Tmc4671,
    analog: AnalogFrontEnd,
    flow: FlowMeter,
}

impl Board {
    pub fn new(driver: Tmc4671, analog: AnalogFrontEnd, flow: FlowMeter) -> Self {
        Self {
            driver,
            analog,
            flow,
        }
    }

    pub fn spi_errors(&self) -> u32 {
        self.driver.spi_errors()
    }
}

impl FocDriver for Board {
    fn read_int(&mut self, motor: usize, register: Register) -> i32 {
        self.driver.read_int(motor, register)
    }

    fn write_int(&mut self, motor: usize, register: Register, value: i32) {
        self.driver.write_int(motor, register, value)
    }

    fn switch_to_motion_mode(&mut self, motor: usize, mode: DriverMotionMode) {
        self.driver.switch_to_motion_mode(motor, mode)
    }

    fn enable_driver(&mut self, motor: usize) {
        self.driver.enable_driver(motor)
    }

    fn disable_driver(&mut self, motor: usize) {
        self.driver.disable_driver(motor)
    }
}

impl AnalogInputs for Board {
    fn supply_voltage_raw(&mut self) -> u16 {
        self.analog
            .adc2
            .blocking_read(&mut self.analog.supply_voltage)
    }

    fn motor_temperature_raw(&mut self) -> u16 {
        self.analog
            .adc1
            .blocking_read(&mut self.analog.motor_temperature)
    }

    fn pressure_raw(&mut self, _motor: usize) -> u16 {
        self.analog.adc1.blocking_read(&mut self.analog.pressure)
    }
}

impl FlowSensor for Board {
    fn probe(&mut self) -> bool {
        self.flow.probe()
    }

    fn read(&mut self) -> Option<FlowSample> {
        self.flow.read()
    }
}

impl Clock for Board {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
