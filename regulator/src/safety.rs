//! 電源電圧・モーター温度監視
//!
//! 電源電圧とサーミスタ温度を毎周期1回サンプリングし、その結果をモーター毎の
//! フラグへ反映します。電圧フラグは記録のみ、過熱は停止とドライバ遮断を伴います。

use crate::config::{temperature, voltage};
use crate::mode::RegulationState;

/// ADC生値 → 電源電圧 [0.1V]
pub fn adc_to_voltage(adc_raw: u16) -> i16 {
    ((adc_raw as i32 * voltage::SCALE_NUMERATOR) / voltage::SCALE_DENOMINATOR) as i16
}

/// ADC生値 → モーター温度 [°C]
///
/// サーミスタはGND側、プルアップは基準電圧側。
/// `adc == 0`（短絡）は最高温度、`adc >= ADC_MAX`（断線）は最低温度として扱います。
pub fn adc_to_temperature(adc_raw: u16) -> i16 {
    if adc_raw == 0 {
        return i16::MAX;
    }
    if adc_raw >= temperature::ADC_MAX {
        return i16::MIN;
    }

    // R = R_pull * adc / (adc_max - adc)
    let adc = adc_raw as f32;
    let resistance =
        temperature::PULL_RESISTOR * adc / (temperature::ADC_MAX as f32 - adc);

    // β式: 1/T = 1/T0 + ln(R/R0)/B
    let inverse_t = 1.0 / temperature::REFERENCE_TEMPERATURE
        + libm::logf(resistance / temperature::NOMINAL_RESISTANCE) / temperature::BETA;
    let celsius = 1.0 / inverse_t - temperature::ZERO_CELSIUS;

    libm::roundf(celsius).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// 電源電圧・温度の監視結果（全モーター共通）
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyMonitor {
    /// 電源電圧 [0.1V]
    supply_voltage: i16,
    /// モーター温度 [°C]
    motor_temperature: i16,
}

impl SafetyMonitor {
    pub const fn new() -> Self {
        Self {
            supply_voltage: 0,
            motor_temperature: 0,
        }
    }

    /// 新しいADCサンプルで測定値を更新
    pub fn update(&mut self, voltage_raw: u16, temperature_raw: u16) {
        self.supply_voltage = adc_to_voltage(voltage_raw);
        self.motor_temperature = adc_to_temperature(temperature_raw);
    }

    pub fn supply_voltage(&self) -> i16 {
        self.supply_voltage
    }

    pub fn motor_temperature(&self) -> i16 {
        self.motor_temperature
    }

    /// 測定値をモーターの状態フラグへ反映
    ///
    /// # Returns
    /// 過熱状態へ遷移した周期のみ `true`（呼び出し側で停止・ドライバ遮断）
    pub fn apply(&self, motor: usize, state: &mut RegulationState) -> bool {
        self.apply_voltage(motor, state);
        self.apply_temperature(motor, state)
    }

    /// 3領域ヒステリシス
    fn apply_voltage(&self, motor: usize, state: &mut RegulationState) {
        let v = self.supply_voltage as i32;
        let was = (state.overvoltage, state.undervoltage);

        if v > voltage::OVERVOLTAGE_THRESHOLD {
            state.overvoltage = true;
            state.undervoltage = false;
        } else if v < voltage::UNDERVOLTAGE_THRESHOLD {
            state.undervoltage = true;
            state.overvoltage = false;
        } else if v > voltage::RECOVERED_THRESHOLD {
            state.overvoltage = false;
            state.undervoltage = false;
        }

        if was != (state.overvoltage, state.undervoltage) {
            if state.overvoltage {
                warn!("motor {}: overvoltage {} [0.1V]", motor, v);
            } else if state.undervoltage {
                warn!("motor {}: undervoltage {} [0.1V]", motor, v);
            } else {
                info!("motor {}: supply voltage recovered {} [0.1V]", motor, v);
            }
        }
    }

    fn apply_temperature(&self, motor: usize, state: &mut RegulationState) -> bool {
        let t = self.motor_temperature;

        if t >= temperature::CRITICAL_HIGH {
            if !state.overtemperature {
                state.overtemperature = true;
                error!("motor {}: overtemperature {} C, driver disabled", motor, t);
                return true;
            }
        } else if t < temperature::CRITICAL_LOW && state.overtemperature {
            state.overtemperature = false;
            info!("motor {}: temperature back to {} C", motor, t);
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 指定電圧 [0.1V] になるADC値（切り上げ）
    fn voltage_adc(decivolts: i32) -> u16 {
        ((decivolts * voltage::SCALE_DENOMINATOR + voltage::SCALE_NUMERATOR - 1)
            / voltage::SCALE_NUMERATOR) as u16
    }

    fn monitor(voltage_raw: u16, temperature_raw: u16) -> SafetyMonitor {
        let mut monitor = SafetyMonitor::new();
        monitor.update(voltage_raw, temperature_raw);
        monitor
    }

    #[test]
    fn test_voltage_conversion() {
        assert_eq!(adc_to_voltage(0), 0);
        assert_eq!(adc_to_voltage(4095), 363);
        assert_eq!(adc_to_voltage(voltage_adc(240)), 240);
    }

    #[test]
    fn test_voltage_hysteresis() {
        let room = 2047;
        let mut state = RegulationState::new();

        monitor(voltage_adc(310), room).apply(0, &mut state);
        assert!(state.overvoltage);

        // 20V < v <= 30V: 過電圧解除
        monitor(voltage_adc(250), room).apply(0, &mut state);
        assert!(!state.overvoltage && !state.undervoltage);

        monitor(voltage_adc(170), room).apply(0, &mut state);
        assert!(state.undervoltage);

        // 18V..20V は保持
        monitor(voltage_adc(190), room).apply(0, &mut state);
        assert!(state.undervoltage);

        monitor(voltage_adc(210), room).apply(0, &mut state);
        assert!(!state.undervoltage);
    }

    #[test]
    fn test_undervoltage_clears_overvoltage() {
        let mut state = RegulationState::new();
        state.overvoltage = true;
        monitor(voltage_adc(100), 2047).apply(0, &mut state);
        assert!(state.undervoltage);
        assert!(!state.overvoltage);
    }

    #[test]
    fn test_voltage_does_not_touch_mode() {
        let mut state = RegulationState::new();
        state.motion_mode = crate::mode::MotionMode::Velocity;
        let tripped = monitor(voltage_adc(350), 2047).apply(0, &mut state);
        assert!(!tripped);
        assert_eq!(state.motion_mode, crate::mode::MotionMode::Velocity);
    }

    #[test]
    fn test_temperature_conversion() {
        // 分圧中点 = R0 → 25°C
        assert_eq!(adc_to_temperature(2048), 25);
        // 抵抗が下がるほど高温
        assert!(adc_to_temperature(300) > adc_to_temperature(1000));
        assert_eq!(adc_to_temperature(0), i16::MAX);
        assert_eq!(adc_to_temperature(4095), i16::MIN);
    }

    #[test]
    fn test_overtemperature_edge() {
        let mut state = RegulationState::new();
        let hot = monitor(2048, 0);

        assert!(hot.apply(0, &mut state));
        assert!(state.overtemperature);
        // 継続中は再通知しない
        assert!(!hot.apply(0, &mut state));
        assert!(!hot.apply(0, &mut state));
    }

    #[test]
    fn test_overtemperature_hysteresis() {
        let mut state = RegulationState::new();
        state.overtemperature = true;

        // 80°C以上は保持（R ≈ 1.25kΩ → 約91°C）
        let warm = monitor(2048, 455);
        let t = warm.motor_temperature();
        assert!((80..100).contains(&t), "t = {}", t);
        assert!(!warm.apply(0, &mut state));
        assert!(state.overtemperature);

        monitor(2048, 2048).apply(0, &mut state);
        assert!(!state.overtemperature);
    }
}
