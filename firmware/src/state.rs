//! グローバル共有状態管理
//!
//! 制御タスクが公開するステータスをMutexで保護して管理します。

use blower_regulator::MotionMode;
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::mutex::Mutex;

/// 制御ステータスのスナップショット
#[derive(Clone, Copy)]
pub struct RegulationStatus {
    pub motion_mode: MotionMode,
    pub initialized: bool,
    pub overvoltage: bool,
    pub undervoltage: bool,
    pub overtemperature: bool,
    /// 電源電圧 [0.1V]
    pub supply_voltage: i16,
    /// モーター温度 [°C]
    pub motor_temperature: i16,
    /// 実速度 [RPM]
    pub actual_velocity: i32,
    /// 実圧力 [Pa]
    pub actual_pressure: i32,
    /// 積算容量 [ml]
    pub actual_volume: i32,
}

impl RegulationStatus {
    pub const fn new() -> Self {
        Self {
            motion_mode: MotionMode::Stop,
            initialized: false,
            overvoltage: false,
            undervoltage: false,
            overtemperature: false,
            supply_voltage: 0,
            motor_temperature: 0,
            actual_velocity: 0,
            actual_pressure: 0,
            actual_volume: 0,
        }
    }

    /// 電圧・温度異常の有無
    pub fn has_fault(&self) -> bool {
        self.overvoltage || self.undervoltage || self.overtemperature
    }
}

/// 制御ステータス（LED表示用）
pub static REGULATION_STATUS: Mutex<ThreadModeRawMutex, RegulationStatus> =
    Mutex::new(RegulationStatus::new());
