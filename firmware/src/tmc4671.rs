//! TMC4671 SPI ドライバ
//!
//! 40bit データグラム（アドレス8bit + データ32bit、MSBファースト）で
//! レジスタを読み書きします。TMC6100 の有効化ピンもここで管理します。

use blower_regulator::tmc4671::{fields, DriverMotionMode, Register};
use blower_regulator::FocDriver;
use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Blocking;
use embassy_stm32::spi::Spi;

use crate::config::spi::{DATAGRAM_LEN, WRITE_BIT};
use crate::fmt::*;

pub struct Tmc4671 {
    spi: Spi<'static, Blocking>,
    cs: Output<'static>,
    enable: Output<'static>,
    /// SPI エラー発生回数
    errors: u32,
}

impl Tmc4671 {
    pub fn new(spi: Spi<'static, Blocking>, cs: Output<'static>, enable: Output<'static>) -> Self {
        Self {
            spi,
            cs,
            enable,
            errors: 0,
        }
    }

    /// 1データグラムの送受信
    ///
    /// 失敗時は受信データを0として扱います（最初の1回のみログ）。
    fn transfer(&mut self, datagram: &mut [u8; DATAGRAM_LEN]) {
        self.cs.set_low();
        let result = self.spi.blocking_transfer_in_place(datagram);
        self.cs.set_high();

        if result.is_err() {
            if self.errors == 0 {
                warn!("TMC4671 SPI transfer failed");
            }
            self.errors = self.errors.wrapping_add(1);
            datagram[1..].fill(0);
        }
    }

    pub fn spi_errors(&self) -> u32 {
        self.errors
    }
}

impl FocDriver for Tmc4671 {
    fn read_int(&mut self, _motor: usize, register: Register) -> i32 {
        let mut datagram = [register.address() & !WRITE_BIT, 0, 0, 0, 0];
        self.transfer(&mut datagram);
        i32::from_be_bytes([datagram[1], datagram[2], datagram[3], datagram[4]])
    }

    fn write_int(&mut self, _motor: usize, register: Register, value: i32) {
        let [b0, b1, b2, b3] = value.to_be_bytes();
        let mut datagram = [register.address() | WRITE_BIT, b0, b1, b2, b3];
        self.transfer(&mut datagram);
    }

    fn switch_to_motion_mode(&mut self, motor: usize, mode: DriverMotionMode) {
        self.write_field(motor, fields::MODE_MOTION, mode as i32);
    }

    fn enable_driver(&mut self, _motor: usize) {
        self.enable.set_high();
    }

    fn disable_driver(&mut self, _motor: usize) {
        self.enable.set_low();
    }
}
