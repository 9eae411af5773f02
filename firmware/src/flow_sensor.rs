//! 流量センサ（SFM3000系、I2C）

use blower_regulator::{FlowSample, FlowSensor};
use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;

use crate::config::flow_sensor::{ADDRESS, RESPONSE_LEN, START_MEASUREMENT};
use crate::fmt::*;

pub struct FlowMeter {
    i2c: I2c<'static, Blocking>,
}

impl FlowMeter {
    pub fn new(i2c: I2c<'static, Blocking>) -> Self {
        Self { i2c }
    }
}

impl FlowSensor for FlowMeter {
    /// 測定開始コマンドへのACKで存在を判定
    fn probe(&mut self) -> bool {
        self.i2c.blocking_write(ADDRESS, &START_MEASUREMENT).is_ok()
    }

    fn read(&mut self) -> Option<FlowSample> {
        let mut response = [0u8; RESPONSE_LEN];
        self.i2c
            .blocking_write_read(ADDRESS, &START_MEASUREMENT, &mut response)
            .ok()?;
        trace!("flow sensor response {}", Bytes(&response));

        Some(FlowSample {
            raw: u16::from_be_bytes([response[0], response[1]]),
            status: response[2] as u16,
        })
    }
}
