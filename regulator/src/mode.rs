//! 制御モード状態機械
//!
//! 運動目標（Stop / Torque / Velocity / Pressure / Volume）と、
//! それとは独立した転流モード（Disabled / OpenLoop / DigitalHall）を管理します。

use crate::config::{CommutationMode, MotorConfig};
use crate::hal::FocDriver;
use crate::tmc4671::{DriverMotionMode, PhiESelection, Register};

/// 運動目標（常にどれか一つだけが有効）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionMode {
    Stop,
    Torque,
    Velocity,
    Pressure,
    Volume,
}

impl MotionMode {
    /// この運動目標に対応するドライバの電気的モード
    ///
    /// 圧力・容量制御も最終的には電流指令なのでトルクモードになります。
    pub fn driver_motion_mode(self) -> DriverMotionMode {
        match self {
            MotionMode::Stop => DriverMotionMode::Stopped,
            MotionMode::Velocity => DriverMotionMode::Velocity,
            MotionMode::Torque | MotionMode::Pressure | MotionMode::Volume => {
                DriverMotionMode::Torque
            }
        }
    }
}

/// 制御状態（モーター毎）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegulationState {
    /// 現在の運動目標
    pub motion_mode: MotionMode,
    /// 転流モード適用済み
    pub initialized: bool,
    /// 過電圧
    pub overvoltage: bool,
    /// 低電圧
    pub undervoltage: bool,
    /// 過熱
    pub overtemperature: bool,
    /// 最後に適用した転流モード（None: 未適用）
    pub applied_commutation: Option<CommutationMode>,
}

impl RegulationState {
    pub const fn new() -> Self {
        Self {
            motion_mode: MotionMode::Stop,
            initialized: false,
            overvoltage: false,
            undervoltage: false,
            overtemperature: false,
            applied_commutation: None,
        }
    }

    /// 運動目標を切り替える
    ///
    /// DigitalHall 転流時のみドライバのモーションモードも切り替えます。
    pub fn switch_mode<D: FocDriver>(
        &mut self,
        driver: &mut D,
        motor: usize,
        config: &MotorConfig,
        mode: MotionMode,
    ) {
        if self.motion_mode != mode {
            debug!("motor {}: motion mode {} -> {}", motor, self.motion_mode, mode);
        }
        self.motion_mode = mode;

        if config.commutation_mode == CommutationMode::DigitalHall && mode != MotionMode::Stop {
            driver.switch_to_motion_mode(motor, mode.driver_motion_mode());
        }
    }

    /// 転流モードの変更をドライバへ反映する（変化時のみ）
    pub fn check_commutation_mode<D: FocDriver>(
        &mut self,
        driver: &mut D,
        motor: usize,
        config: &MotorConfig,
    ) {
        let mode = config.commutation_mode;
        if self.applied_commutation == Some(mode) {
            return;
        }

        match mode {
            CommutationMode::Disabled => {
                driver.write_int(motor, Register::UqUdExt, 0);
                driver.write_int(
                    motor,
                    Register::PhiESelection,
                    PhiESelection::External as i32,
                );
                driver.switch_to_motion_mode(motor, DriverMotionMode::UqUdExt);
                driver.write_int(motor, Register::OpenloopVelocityTarget, 0);
                self.initialized = false;
            }
            CommutationMode::OpenLoop => {
                driver.write_int(
                    motor,
                    Register::PhiESelection,
                    PhiESelection::OpenLoop as i32,
                );
                driver.switch_to_motion_mode(motor, DriverMotionMode::Torque);
                self.initialized = true;
            }
            CommutationMode::DigitalHall => {
                driver.write_int(motor, Register::PhiESelection, PhiESelection::Hall as i32);
                driver.switch_to_motion_mode(motor, self.motion_mode.driver_motion_mode());
                self.initialized = true;
            }
        }

        info!("motor {}: commutation mode {}", motor, mode);
        self.applied_commutation = Some(mode);
    }
}
