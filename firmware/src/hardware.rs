//! ハードウェア初期化モジュール
//!
//! クロック設定と、制御コアへ渡すボード抽象の組み立てを行います。

use embassy_stm32::{
    adc::{Adc, AdcChannel},
    gpio::{Level, Output, Speed},
    i2c::{self, I2c},
    spi::{self, Spi},
    Config, Peripherals,
};

use crate::board::{AnalogFrontEnd, Board};
use crate::config;
use crate::flow_sensor::FlowMeter;
use crate::fmt::*;
use crate::tmc4671::Tmc4671;

/// RCCクロック設定を初期化
///
/// HSI → PLL（÷4 × 85 ÷ 2）で170MHz生成
pub fn create_clock_config() -> Config {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::mux::{Adcsel, ClockMux};
        use embassy_stm32::rcc::{Pll, PllMul, PllPreDiv, PllRDiv, PllSource, Sysclk};

        config.rcc.hsi = true;
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL85,
            divp: None,
            divq: None,
            divr: Some(PllRDiv::DIV2),
        });
        config.rcc.sys = Sysclk::PLL1_R; // システムクロックをPLLに設定

        let mut clock_mux = ClockMux::default();
        clock_mux.adc12sel = Adcsel::SYS;
        config.rcc.mux = clock_mux;
    }
    config
}

/// ステータスLED（アクティブLow）
pub struct Leds {
    pub led1: Output<'static>,
    pub led2: Output<'static>,
    pub led3: Output<'static>,
}

/// ペリフェラルからボード抽象とLEDを組み立てる
///
/// - SPI2: PB13=SCK, PB14=MISO, PB15=MOSI, PB12=CS（TMC4671）
/// - PB11: TMC6100 ドライバ有効
/// - I2C2: PA9=SCL, PA8=SDA（流量センサ）
/// - ADC2: PC1=電源電圧
/// - ADC1: PA0=モーター温度, PA1=圧力
/// - PC13/PC14/PC15: LED
pub fn init_peripherals(p: Peripherals) -> (Board, Leds) {
    let leds = Leds {
        led1: Output::new(p.PC13, Level::High, Speed::Low),
        led2: Output::new(p.PC14, Level::High, Speed::Low),
        led3: Output::new(p.PC15, Level::High, Speed::Low),
    };

    let mut spi_config = spi::Config::default();
    spi_config.frequency = config::spi::FREQUENCY;
    spi_config.mode = spi::MODE_3;
    let spi = Spi::new_blocking(p.SPI2, p.PB13, p.PB15, p.PB14, spi_config);
    let cs = Output::new(p.PB12, Level::High, Speed::VeryHigh);
    let enable = Output::new(p.PB11, Level::Low, Speed::Low);
    let driver = Tmc4671::new(spi, cs, enable);
    info!("TMC4671 SPI initialized");

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = config::flow_sensor::FREQUENCY;
    let i2c = I2c::new_blocking(p.I2C2, p.PA9, p.PA8, i2c_config);
    let flow = FlowMeter::new(i2c);

    let mut adc1 = Adc::new(p.ADC1);
    adc1.set_sample_time(config::adc::SAMPLE_TIME);
    let mut adc2 = Adc::new(p.ADC2);
    adc2.set_sample_time(config::adc::SAMPLE_TIME);

    let analog = AnalogFrontEnd {
        adc1,
        adc2,
        supply_voltage: p.PC1.degrade_adc(),
        motor_temperature: p.PA0.degrade_adc(),
        pressure: p.PA1.degrade_adc(),
    };

    (Board::new(driver, analog, flow), leds)
}
