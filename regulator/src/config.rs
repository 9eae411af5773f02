//! モーター設定と固定パラメータ
//!
//! 実行時に変更可能な設定は `MotorConfig`、校正済みの固定小数点スケールや
//! 安全しきい値は定数としてここに集約します。

use crate::error::ParamError;
use crate::pt1::Pt1Params;

/// モーター数
pub const NUMBER_OF_MOTORS: usize = 1;

/// 目標速度・最大速度の上限 [RPM]
pub const MAX_VELOCITY: i32 = 200_000;

/// 加速度の上限 [RPM/s]
pub const MAX_ACCELERATION: i32 = 100_000;

/// 電流の上限 [mA]
pub const MAX_CURRENT: i32 = 5_000;

/// 最大圧力設定の上限 [Pa]
pub const MAX_PRESSURE: i32 = 10_000;

/// 目標容量の上限 [ml]
pub const MAX_VOLUME: i32 = 3_000;

/// 圧力/容量PIゲインの上限
pub const MAX_PI_GAIN: u16 = 32_767;

/// 実測フィルタ係数（weight, shift）
pub mod filter {
    use super::Pt1Params;

    /// 実電流
    pub const CURRENT: Pt1Params = Pt1Params::new(16, 8);
    /// 実圧力
    pub const PRESSURE: Pt1Params = Pt1Params::new(64, 8);
    /// 流量（表示用）
    pub const FLOW: Pt1Params = Pt1Params::new(32, 8);
}

/// TMC4671 生値の換算
pub mod driver {
    /// 電流生値 ↔ mA 換算の分母（raw = mA * 256 / dual_shunt_factor）
    pub const CURRENT_SCALE_DIVISOR: i32 = 256;

    /// トルク/フラックス実測値の有効範囲（この範囲外のフレームは破棄）
    pub const TORQUE_FLUX_VALID_LIMIT: i32 = 32_000;
}

/// 電源電圧監視 [0.1V]
pub mod voltage {
    /// ADC 12bit・3.3V基準・1:11分圧 → 0.1V単位（adc * 363 / 4095）
    pub const SCALE_NUMERATOR: i32 = 363;
    pub const SCALE_DENOMINATOR: i32 = 4_095;

    /// これを超えると過電圧（30.0V）
    pub const OVERVOLTAGE_THRESHOLD: i32 = 300;
    /// これを下回ると低電圧（18.0V）
    pub const UNDERVOLTAGE_THRESHOLD: i32 = 180;
    /// これを超えると両フラグ解除（20.0V）
    pub const RECOVERED_THRESHOLD: i32 = 200;
}

/// モーター温度監視（NTCサーミスタ、プルアップ分圧）
pub mod temperature {
    /// ADC最大値（12bit）
    pub const ADC_MAX: u16 = 4_095;
    /// プルアップ抵抗 [Ω]
    pub const PULL_RESISTOR: f32 = 10_000.0;
    /// サーミスタ公称抵抗 [Ω]
    pub const NOMINAL_RESISTANCE: f32 = 10_000.0;
    /// B定数 [K]
    pub const BETA: f32 = 3_435.0;
    /// 公称抵抗の基準温度 [K]
    pub const REFERENCE_TEMPERATURE: f32 = 298.15;
    /// 0°C [K]
    pub const ZERO_CELSIUS: f32 = 273.15;

    /// これ以上で過熱遮断 [°C]
    pub const CRITICAL_HIGH: i16 = 100;
    /// これを下回ると過熱フラグ解除 [°C]
    pub const CRITICAL_LOW: i16 = 80;
}

/// 圧力センサ（ADC）→ Pa
pub mod pressure {
    /// 0Pa 時のADC値
    pub const ADC_ZERO: i32 = 164;
    /// pressure = (adc - ADC_ZERO) * NUMERATOR / DENOMINATOR
    pub const SCALE_NUMERATOR: i32 = 10_000;
    pub const SCALE_DENOMINATOR: i32 = 3_686;
}

/// I2C流量センサ
pub mod flow {
    /// 無流量時の生値
    pub const SENSOR_OFFSET: i32 = 32_000;
    /// 1 slm あたりのカウント
    pub const SCALE_FACTOR: i32 = 140;
    /// slm → ml/min
    pub const ML_PER_LITER: i32 = 1_000;
    /// ml/min を 1ms 毎に積算した値 → ml
    pub const MS_PER_MINUTE: i64 = 60_000;
}

/// 回転方向（シャフトビット）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShaftDirection {
    /// シャフトビット0: 速度・トルクの符号を反転
    Inverted = 0,
    /// シャフトビット1
    Normal = 1,
}

impl ShaftDirection {
    /// シャフトビット補正
    pub fn apply(self, value: i32) -> i32 {
        match self {
            ShaftDirection::Inverted => -value,
            ShaftDirection::Normal => value,
        }
    }
}

impl TryFrom<u8> for ShaftDirection {
    type Error = ParamError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ShaftDirection::Inverted),
            1 => Ok(ShaftDirection::Normal),
            _ => Err(ParamError::InvalidEnum),
        }
    }
}

/// 転流モード（電気角の取得方法）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommutationMode {
    Disabled = 0,
    OpenLoop = 1,
    DigitalHall = 2,
}

impl TryFrom<u8> for CommutationMode {
    type Error = ParamError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CommutationMode::Disabled),
            1 => Ok(CommutationMode::OpenLoop),
            2 => Ok(CommutationMode::DigitalHall),
            _ => Err(ParamError::InvalidEnum),
        }
    }
}

/// ホールセンサ設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HallConfig {
    pub polarity: bool,
    pub direction: bool,
    pub interpolation: bool,
    /// 電気角オフセット（TMC4671 phi_e 単位）
    pub phi_e_offset: i16,
}

impl HallConfig {
    pub const fn default() -> Self {
        Self {
            polarity: false,
            direction: false,
            interpolation: false,
            phi_e_offset: 0,
        }
    }
}

/// モーター設定（モーター毎）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorConfig {
    /// 極対数
    pub pole_pairs: u8,
    /// 回転方向
    pub shaft_direction: ShaftDirection,
    /// 転流モード
    pub commutation_mode: CommutationMode,
    /// デュアルシャント電流換算係数
    pub dual_shunt_factor: u16,
    /// 相電流ADCオフセット
    pub adc_i0_offset: u16,
    pub adc_i1_offset: u16,
    /// トルク/フラックス電流制限（ドライバ側）[mA]
    pub max_current: u16,
    /// 圧力制御の正方向電流制限 [mA]
    pub positive_current_limit: i32,
    /// 圧力制御の負方向電流制限（絶対値）[mA]
    pub negative_current_limit: i32,
    /// 最大速度 [RPM]
    pub max_velocity: i32,
    /// 加速度 [RPM/s]
    pub acceleration: i32,
    /// 速度ランプ有効
    pub use_velocity_ramp: bool,
    /// 最大圧力 [Pa]
    pub max_pressure: i32,
    /// オープンループ電流 [mA]
    pub open_loop_current: u16,
    /// TMC4671 内部PIゲイン
    pub torque_p: u16,
    pub torque_i: u16,
    pub velocity_p: u16,
    pub velocity_i: u16,
    /// 圧力PIゲイン
    pub pressure_p: u16,
    pub pressure_i: u16,
    /// 容量PIゲイン
    pub volume_p: u16,
    pub volume_i: u16,
    /// ホールセンサ設定
    pub hall: HallConfig,
}

impl MotorConfig {
    /// デフォルト設定
    pub const fn default() -> Self {
        Self {
            pole_pairs: 4,
            shaft_direction: ShaftDirection::Normal,
            commutation_mode: CommutationMode::Disabled,
            dual_shunt_factor: 256,
            adc_i0_offset: 0x8000,
            adc_i1_offset: 0x8000,
            max_current: 2_000,
            positive_current_limit: 2_000,
            negative_current_limit: 2_000,
            max_velocity: 40_000,
            acceleration: 20_000,
            use_velocity_ramp: true,
            max_pressure: 6_000,
            open_loop_current: 500,
            torque_p: 256,
            torque_i: 256,
            velocity_p: 512,
            velocity_i: 128,
            pressure_p: 512,
            pressure_i: 100,
            volume_p: 1_024,
            volume_i: 50,
            hall: HallConfig::default(),
        }
    }

    /// 極対数（0 は 1 として扱う）
    pub fn pole_pairs(&self) -> i32 {
        self.pole_pairs.max(1) as i32
    }

    /// mA → TMC4671 電流生値
    ///
    /// 16bit 符号付きフィールドに収まるよう飽和させます。
    pub fn current_to_raw(&self, milliamps: i32) -> i32 {
        let factor = (self.dual_shunt_factor as i64).max(1);
        let raw = (milliamps as i64 * driver::CURRENT_SCALE_DIVISOR as i64) / factor;
        raw.clamp(i16::MIN as i64, i16::MAX as i64) as i32
    }

    /// TMC4671 電流生値 → mA
    pub fn raw_to_current(&self, raw: i32) -> i32 {
        let current =
            (raw as i64 * self.dual_shunt_factor as i64) / driver::CURRENT_SCALE_DIVISOR as i64;
        current.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MotorConfig::default();
        assert!(config.pole_pairs >= 1);
        assert_eq!(config.commutation_mode, CommutationMode::Disabled);
        assert!(config.positive_current_limit >= 0);
        assert!(config.negative_current_limit >= 0);
        assert!(config.max_pressure <= MAX_PRESSURE);
    }

    #[test]
    fn test_enum_conversion() {
        assert_eq!(CommutationMode::try_from(2), Ok(CommutationMode::DigitalHall));
        assert_eq!(CommutationMode::try_from(3), Err(ParamError::InvalidEnum));
        assert_eq!(ShaftDirection::try_from(0), Ok(ShaftDirection::Inverted));
        assert_eq!(ShaftDirection::try_from(2), Err(ParamError::InvalidEnum));
    }

    #[test]
    fn test_current_scaling() {
        let mut config = MotorConfig::default();
        config.dual_shunt_factor = 128;
        assert_eq!(config.current_to_raw(1000), 2000);
        assert_eq!(config.raw_to_current(2000), 1000);
        assert_eq!(ShaftDirection::Inverted.apply(5), -5);
    }

    #[test]
    fn test_current_to_raw_saturates() {
        let mut config = MotorConfig::default();
        config.dual_shunt_factor = 10;
        // 5000 * 256 / 10 = 128000 は 16bit を超える
        assert_eq!(config.current_to_raw(5_000), i16::MAX as i32);
        assert_eq!(config.current_to_raw(-5_000), i16::MIN as i32);
    }

    #[test]
    fn test_raw_to_current_large_factor() {
        let mut config = MotorConfig::default();
        config.dual_shunt_factor = u16::MAX;
        assert_eq!(config.raw_to_current(63_998), 16_383_238);
        assert_eq!(config.raw_to_current(-63_998), -16_383_238);
    }

    #[test]
    fn test_pole_pairs_never_zero() {
        let mut config = MotorConfig::default();
        config.pole_pairs = 0;
        assert_eq!(config.pole_pairs(), 1);
    }
}
