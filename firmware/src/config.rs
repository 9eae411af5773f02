//! ボード設定
//!
//! ピン割り当て以外のボード固有パラメータと、起動時のモーター設定をまとめます。

use blower_regulator::{CommutationMode, MotorConfig};

/// 起動時のモーター設定
pub const MOTOR_CONFIG: MotorConfig = MotorConfig {
    commutation_mode: CommutationMode::DigitalHall,
    ..MotorConfig::default()
};

/// TMC4671 SPI設定
pub mod spi {
    use embassy_stm32::time::Hertz;

    /// SPIクロック（TMC4671 最大 8MHz 未満）
    pub const FREQUENCY: Hertz = Hertz(2_000_000);

    /// データグラム長: アドレス1バイト + データ4バイト
    pub const DATAGRAM_LEN: usize = 5;

    /// 書き込み時にアドレスへ立てるビット
    pub const WRITE_BIT: u8 = 0x80;
}

/// 流量センサ（SFM3000系、I2C）
pub mod flow_sensor {
    use embassy_stm32::time::Hertz;

    pub const FREQUENCY: Hertz = Hertz(100_000);

    /// 7bit アドレス
    pub const ADDRESS: u8 = 0x40;

    /// 連続測定開始コマンド
    pub const START_MEASUREMENT: [u8; 2] = [0x10, 0x00];

    /// 流量2バイト + CRC1バイト
    pub const RESPONSE_LEN: usize = 3;
}

/// 制御タスク
pub mod regulation {
    use embassy_time::Duration;

    /// ポーリング周期（1ms より十分短く）
    pub const POLL_PERIOD: Duration = Duration::from_micros(250);

    /// ステータス公開間隔 [ポーリング回数]
    pub const STATUS_PUBLISH_INTERVAL: u32 = 40;
}

/// ADCサンプリング時間
pub mod adc {
    use embassy_stm32::adc::SampleTime;

    pub const SAMPLE_TIME: SampleTime = SampleTime::CYCLES92_5;
}
