//! 制御ループ本体
//!
//! 1ms 毎に安全監視・流量積算・実測値の取得・カスケード制御を順に実行し、
//! 転流モードに応じて TMC4671 へ目標値を書き込みます。
//! 設定変更・モード指令もここを経由し、範囲外の値は状態を変えずに拒否します。

use crate::config::driver::TORQUE_FLUX_VALID_LIMIT;
use crate::config::{
    filter, pressure, CommutationMode, HallConfig, MotorConfig, ShaftDirection,
    MAX_ACCELERATION, MAX_CURRENT, MAX_PI_GAIN, MAX_PRESSURE, MAX_VELOCITY, MAX_VOLUME,
    NUMBER_OF_MOTORS,
};
use crate::error::ParamError;
use crate::flow::FlowVolume;
use crate::hal::{AnalogInputs, FocDriver, Hardware};
use crate::mode::{MotionMode, RegulationState};
use crate::pi::{Limits, PiControl, PRESSURE_PI_SCALE, VOLUME_PI_SCALE};
use crate::pt1::Pt1Filter;
use crate::ramp::LinearRamp;
use crate::safety::SafetyMonitor;
use crate::tmc4671::{fields, hall_mode, DriverMotionMode, Register};

/// 圧力センサADC生値 → Pa
pub fn adc_to_pressure(adc_raw: u16) -> i32 {
    ((adc_raw as i32 - pressure::ADC_ZERO) * pressure::SCALE_NUMERATOR) / pressure::SCALE_DENOMINATOR
}

/// モーター1台分の制御状態
#[derive(Debug, Clone, Copy)]
pub struct MotorChannel {
    config: MotorConfig,
    state: RegulationState,
    ramp: LinearRamp,
    pressure_pi: PiControl,
    volume_pi: PiControl,
    current_filter: Pt1Filter,
    pressure_filter: Pt1Filter,
    /// 速度モードの指令速度 [RPM]
    desired_velocity: i32,
    /// 実速度 [RPM]（シャフト補正済み）
    actual_velocity: i32,
    /// ランプ出力 = ドライバへの目標速度 [RPM]
    target_speed: i32,
    /// 目標トルク電流 [mA]
    target_torque: i32,
    /// 目標圧力 [Pa]
    target_pressure: i32,
    /// 目標容量 [ml]
    target_volume: i32,
}

impl MotorChannel {
    const fn new(config: MotorConfig) -> Self {
        Self {
            config,
            state: RegulationState::new(),
            ramp: LinearRamp::new(
                config.max_velocity,
                config.acceleration,
                config.use_velocity_ramp,
            ),
            pressure_pi: PiControl::new(),
            volume_pi: PiControl::new(),
            current_filter: Pt1Filter::new(),
            pressure_filter: Pt1Filter::new(),
            desired_velocity: 0,
            actual_velocity: 0,
            target_speed: 0,
            target_torque: 0,
            target_pressure: 0,
            target_volume: 0,
        }
    }

    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    pub fn state(&self) -> &RegulationState {
        &self.state
    }

    pub fn motion_mode(&self) -> MotionMode {
        self.state.motion_mode
    }

    pub fn desired_velocity(&self) -> i32 {
        self.desired_velocity
    }

    pub fn actual_velocity(&self) -> i32 {
        self.actual_velocity
    }

    /// ランプジェネレータ出力 [RPM]
    pub fn ramp_velocity(&self) -> i32 {
        self.target_speed
    }

    /// フィルタ済み実電流 [mA]
    pub fn actual_current(&self) -> i32 {
        self.current_filter.output()
    }

    /// フィルタ済み実圧力 [Pa]
    pub fn actual_pressure(&self) -> i32 {
        self.pressure_filter.output()
    }

    pub fn target_torque(&self) -> i32 {
        self.target_torque
    }

    pub fn target_pressure(&self) -> i32 {
        self.target_pressure
    }

    pub fn target_volume(&self) -> i32 {
        self.target_volume
    }

    pub fn pressure_error_sum(&self) -> i64 {
        self.pressure_pi.error_sum()
    }

    pub fn volume_error_sum(&self) -> i64 {
        self.volume_pi.error_sum()
    }

    /// 実速度の取得（オープンループ時はランプ速度）
    fn read_actual_velocity<D: FocDriver>(&mut self, driver: &mut D, motor: usize) {
        if self.config.commutation_mode == CommutationMode::OpenLoop {
            self.actual_velocity = self.ramp.ramp_velocity();
            return;
        }

        let electrical = driver.read_int(motor, Register::PidVelocityActual);
        self.actual_velocity = self
            .config
            .shaft_direction
            .apply(electrical / self.config.pole_pairs());
    }

    /// トルク+フラックス実測値を電流へ換算してフィルタ
    ///
    /// 有効範囲外のフレームは破棄し、前回のフィルタ値を保持します。
    fn read_actual_current<D: FocDriver>(&mut self, driver: &mut D, motor: usize) {
        let raw = driver.read_int(motor, Register::PidTorqueFluxActual);
        let torque = fields::PID_TORQUE_ACTUAL.extract(raw);
        let flux = fields::PID_FLUX_ACTUAL.extract(raw);

        if torque.abs() >= TORQUE_FLUX_VALID_LIMIT || flux.abs() >= TORQUE_FLUX_VALID_LIMIT {
            return;
        }

        let mut current = self.config.raw_to_current(torque + flux);
        if self.config.commutation_mode != CommutationMode::OpenLoop {
            current = self.config.shaft_direction.apply(current);
        }
        self.current_filter.update(current, filter::CURRENT);
    }

    fn read_actual_pressure<A: AnalogInputs>(&mut self, adc: &mut A, motor: usize) {
        let pressure = adc_to_pressure(adc.pressure_raw(motor));
        self.pressure_filter.update(pressure, filter::PRESSURE);
    }

    /// カスケード制御（容量 → 圧力 → トルク / 速度ランプ）
    fn run_cascade(&mut self, actual_volume: i32) {
        let config = self.config;
        self.pressure_pi.set_gains(config.pressure_p, config.pressure_i);
        self.volume_pi.set_gains(config.volume_p, config.volume_i);
        self.ramp.max_velocity = config.max_velocity;
        self.ramp.acceleration = config.acceleration;
        self.ramp.enabled = config.use_velocity_ramp;

        let mode = self.state.motion_mode;

        if mode == MotionMode::Volume {
            self.target_pressure = self.volume_pi.compute(
                self.target_volume,
                actual_volume,
                Limits::new(0, MAX_VOLUME),
                Limits::new(0, config.max_pressure),
                VOLUME_PI_SCALE,
            );
        }

        match mode {
            MotionMode::Pressure | MotionMode::Volume => {
                // 逆回転中は負トルクを出さない
                let min_torque = if self.actual_velocity < 0 {
                    0
                } else {
                    -config.negative_current_limit
                };
                self.target_torque = self.pressure_pi.compute(
                    self.target_pressure,
                    self.actual_pressure(),
                    Limits::new(0, config.max_pressure),
                    Limits::new(min_torque, config.positive_current_limit),
                    PRESSURE_PI_SCALE,
                );
                self.ramp.track(self.actual_velocity);
                self.target_speed = self.actual_velocity;
            }
            MotionMode::Velocity => {
                self.ramp.target_velocity = self.desired_velocity;
                self.target_speed = self.ramp.compute();
            }
            MotionMode::Torque => {
                self.ramp.track(self.actual_velocity);
                self.target_speed = self.actual_velocity;
            }
            MotionMode::Stop => {}
        }
    }

    /// 目標値をドライバへ書き込む（停止中は何もしない）
    fn apply_outputs<D: FocDriver>(&self, driver: &mut D, motor: usize) {
        let mode = self.state.motion_mode;
        if mode == MotionMode::Stop {
            return;
        }

        let config = &self.config;
        let shaft = config.shaft_direction;

        match config.commutation_mode {
            CommutationMode::OpenLoop => {
                driver.switch_to_motion_mode(motor, DriverMotionMode::Torque);

                // オープンループ電流は回転方向に依存しない
                let flux = if self.target_speed == 0 {
                    0
                } else {
                    config.open_loop_current as i32
                };
                driver.write_field(motor, fields::PID_FLUX_TARGET, config.current_to_raw(flux));
                driver.write_field(motor, fields::PID_TORQUE_TARGET, 0);
                driver.write_int(
                    motor,
                    Register::OpenloopVelocityTarget,
                    shaft.apply(self.target_speed),
                );
            }
            CommutationMode::DigitalHall if self.state.initialized => {
                if mode == MotionMode::Velocity {
                    driver.write_int(
                        motor,
                        Register::PidVelocityTarget,
                        shaft.apply(self.target_speed) * config.pole_pairs(),
                    );
                } else {
                    let torque = config.current_to_raw(shaft.apply(self.target_torque));
                    driver.write_field(motor, fields::PID_TORQUE_TARGET, torque);
                }
                // フラックスは指令しない
                driver.write_field(motor, fields::PID_FLUX_TARGET, 0);
            }
            _ => {}
        }
    }

    /// 電流モードへ入る前の共通処理
    fn enter_current_mode(&mut self, mode: MotionMode) {
        if self.state.motion_mode == mode {
            return;
        }
        self.ramp.track(self.actual_velocity);
        self.target_speed = self.actual_velocity;
        match mode {
            MotionMode::Pressure => self.pressure_pi.reset(),
            MotionMode::Volume => {
                self.pressure_pi.reset();
                self.volume_pi.reset();
            }
            _ => {}
        }
    }

    /// 電流を指令するモードが使える転流モードか
    fn check_closed_loop(&self) -> Result<(), ParamError> {
        match self.config.commutation_mode {
            CommutationMode::Disabled => Err(ParamError::CommutationDisabled),
            CommutationMode::OpenLoop => Err(ParamError::NotSupportedInOpenLoop),
            CommutationMode::DigitalHall => Ok(()),
        }
    }
}

fn check_range(value: i32, min: i32, max: i32) -> Result<(), ParamError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ParamError::OutOfRange)
    }
}

fn check_gain(gain: u16) -> Result<(), ParamError> {
    if gain <= MAX_PI_GAIN {
        Ok(())
    } else {
        Err(ParamError::OutOfRange)
    }
}

/// 制御コア
///
/// ハードウェアとモーター毎の状態をすべて所有します。
pub struct Controller<H: Hardware, const N: usize = NUMBER_OF_MOTORS> {
    hardware: H,
    motors: [MotorChannel; N],
    safety: SafetyMonitor,
    flow: FlowVolume,
    /// 最後に処理したミリ秒カウンタ値
    last_tick: Option<u32>,
    /// 実行した制御周期の回数（ラップアラウンド）
    loop_count: u32,
}

impl<H: Hardware, const N: usize> Controller<H, N> {
    /// デフォルト設定で作成
    pub fn new(hardware: H) -> Self {
        Self::with_config(hardware, [MotorConfig::default(); N])
    }

    pub fn with_config(hardware: H, configs: [MotorConfig; N]) -> Self {
        Self {
            hardware,
            motors: configs.map(MotorChannel::new),
            safety: SafetyMonitor::new(),
            flow: FlowVolume::new(),
            last_tick: None,
            loop_count: 0,
        }
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    /// 状態を初期化し、設定をドライバへ反映、流量センサを検出
    pub fn init(&mut self) {
        for motor in 0..N {
            let config = self.motors[motor].config;
            self.motors[motor] = MotorChannel::new(config);
            self.write_motor_config(motor);
        }
        self.safety = SafetyMonitor::new();
        self.flow.init(&mut self.hardware);
        self.last_tick = None;
        self.loop_count = 0;
        info!("regulator initialized, {} motor(s)", N);
    }

    /// 1ms 周期処理（同じミリ秒内の再呼び出しは何もしない）
    pub fn process_tick(&mut self) {
        let now = self.hardware.now_ms();
        if self.last_tick == Some(now) {
            return;
        }
        self.last_tick = Some(now);
        self.loop_count = self.loop_count.wrapping_add(1);

        let voltage_raw = self.hardware.supply_voltage_raw();
        let temperature_raw = self.hardware.motor_temperature_raw();
        self.safety.update(voltage_raw, temperature_raw);
        self.flow.update(&mut self.hardware);

        let actual_volume = self.flow.volume();
        for motor in 0..N {
            self.regulate(motor, actual_volume);
        }
    }

    fn regulate(&mut self, motor: usize, actual_volume: i32) {
        let hardware = &mut self.hardware;
        let channel = &mut self.motors[motor];

        if self.safety.apply(motor, &mut channel.state) {
            channel
                .state
                .switch_mode(hardware, motor, &channel.config, MotionMode::Stop);
            hardware.disable_driver(motor);
        }

        channel
            .state
            .check_commutation_mode(hardware, motor, &channel.config);

        channel.read_actual_velocity(hardware, motor);
        channel.read_actual_current(hardware, motor);
        channel.read_actual_pressure(hardware, motor);

        channel.run_cascade(actual_volume);
        channel.apply_outputs(hardware, motor);
    }

    fn channel_mut(&mut self, motor: usize) -> Result<&mut MotorChannel, ParamError> {
        self.motors.get_mut(motor).ok_or(ParamError::InvalidMotor)
    }

    /// モーター毎の状態（読み取り専用）
    pub fn motor(&self, motor: usize) -> Result<&MotorChannel, ParamError> {
        self.motors.get(motor).ok_or(ParamError::InvalidMotor)
    }

    fn switch_mode(&mut self, motor: usize, mode: MotionMode) {
        let channel = &mut self.motors[motor];
        channel
            .state
            .switch_mode(&mut self.hardware, motor, &channel.config, mode);
    }

    // ===== モード指令 =====

    /// 速度モード [RPM]
    pub fn set_target_velocity(&mut self, motor: usize, velocity: i32) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        if channel.config.commutation_mode == CommutationMode::Disabled {
            return Err(ParamError::CommutationDisabled);
        }
        check_range(velocity, -MAX_VELOCITY, MAX_VELOCITY)?;

        channel.desired_velocity = velocity;
        self.switch_mode(motor, MotionMode::Velocity);
        Ok(())
    }

    /// トルクモード [mA]
    pub fn set_target_motor_current(
        &mut self,
        motor: usize,
        current: i32,
    ) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        channel.check_closed_loop()?;
        check_range(current, -MAX_CURRENT, MAX_CURRENT)?;

        channel.enter_current_mode(MotionMode::Torque);
        channel.target_torque = current;
        self.switch_mode(motor, MotionMode::Torque);
        Ok(())
    }

    /// 圧力モード [Pa]
    pub fn set_target_pressure(&mut self, motor: usize, pressure: i32) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        channel.check_closed_loop()?;
        check_range(pressure, 0, channel.config.max_pressure)?;

        channel.enter_current_mode(MotionMode::Pressure);
        channel.target_pressure = pressure;
        self.switch_mode(motor, MotionMode::Pressure);
        Ok(())
    }

    /// 容量モード [ml]
    pub fn set_target_volume(&mut self, motor: usize, volume: i32) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        channel.check_closed_loop()?;
        check_range(volume, 0, MAX_VOLUME)?;

        channel.enter_current_mode(MotionMode::Volume);
        channel.target_volume = volume;
        self.switch_mode(motor, MotionMode::Volume);
        Ok(())
    }

    pub fn stop(&mut self, motor: usize) -> Result<(), ParamError> {
        self.channel_mut(motor)?;
        self.switch_mode(motor, MotionMode::Stop);
        info!("motor {}: stop", motor);
        Ok(())
    }

    // ===== 操作コマンド =====

    /// 現在の流量を0点にする
    pub fn zero_flow(&mut self) {
        self.flow.zero_flow();
    }

    pub fn reset_volume_integration(&mut self) {
        self.flow.reset_volume_integration();
        info!("volume integration reset");
    }

    /// ドライバ再有効化（過熱中は拒否）
    pub fn enable_driver(&mut self, motor: usize) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        if channel.state.overtemperature {
            warn!("motor {}: enable refused, overtemperature", motor);
            return Err(ParamError::Overtemperature);
        }
        self.hardware.enable_driver(motor);
        info!("motor {}: driver enabled", motor);
        Ok(())
    }

    // ===== 設定 =====

    pub fn set_pole_pairs(&mut self, motor: usize, pole_pairs: u8) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        if pole_pairs == 0 {
            return Err(ParamError::OutOfRange);
        }
        channel.config.pole_pairs = pole_pairs;
        self.write_pole_pairs(motor);
        self.write_velocity_limit(motor);
        Ok(())
    }

    pub fn set_shaft_direction(&mut self, motor: usize, direction: u8) -> Result<(), ParamError> {
        let direction = ShaftDirection::try_from(direction)?;
        self.channel_mut(motor)?.config.shaft_direction = direction;
        Ok(())
    }

    /// 転流モード（ドライバへの反映は次周期）
    pub fn set_commutation_mode(&mut self, motor: usize, mode: u8) -> Result<(), ParamError> {
        let mode = CommutationMode::try_from(mode)?;
        self.channel_mut(motor)?.config.commutation_mode = mode;
        Ok(())
    }

    pub fn set_dual_shunt_factor(&mut self, motor: usize, factor: u16) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        if factor == 0 {
            return Err(ParamError::OutOfRange);
        }
        channel.config.dual_shunt_factor = factor;
        self.write_current_limit(motor);
        Ok(())
    }

    pub fn set_adc_i0_offset(&mut self, motor: usize, offset: u16) -> Result<(), ParamError> {
        self.channel_mut(motor)?.config.adc_i0_offset = offset;
        self.hardware
            .write_field(motor, fields::ADC_I0_OFFSET, offset as i32);
        Ok(())
    }

    pub fn set_adc_i1_offset(&mut self, motor: usize, offset: u16) -> Result<(), ParamError> {
        self.channel_mut(motor)?.config.adc_i1_offset = offset;
        self.hardware
            .write_field(motor, fields::ADC_I1_OFFSET, offset as i32);
        Ok(())
    }

    /// トルク/フラックス電流制限 [mA]
    pub fn set_max_current(&mut self, motor: usize, current: u16) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        check_range(current as i32, 0, MAX_CURRENT)?;
        channel.config.max_current = current;
        self.write_current_limit(motor);
        Ok(())
    }

    pub fn set_positive_current_limit(
        &mut self,
        motor: usize,
        limit: i32,
    ) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        check_range(limit, 0, MAX_CURRENT)?;
        channel.config.positive_current_limit = limit;
        Ok(())
    }

    /// 負方向電流制限（絶対値）[mA]
    pub fn set_negative_current_limit(
        &mut self,
        motor: usize,
        limit: i32,
    ) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        check_range(limit, 0, MAX_CURRENT)?;
        channel.config.negative_current_limit = limit;
        Ok(())
    }

    pub fn set_max_velocity(&mut self, motor: usize, velocity: i32) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        check_range(velocity, 0, MAX_VELOCITY)?;
        channel.config.max_velocity = velocity;
        self.write_velocity_limit(motor);
        Ok(())
    }

    pub fn set_acceleration(&mut self, motor: usize, acceleration: i32) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        check_range(acceleration, 0, MAX_ACCELERATION)?;
        channel.config.acceleration = acceleration;
        Ok(())
    }

    /// 速度ランプ有効（0/1）
    pub fn set_velocity_ramp_enabled(&mut self, motor: usize, enabled: u8) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        channel.config.use_velocity_ramp = match enabled {
            0 => false,
            1 => true,
            _ => return Err(ParamError::InvalidEnum),
        };
        Ok(())
    }

    pub fn set_max_pressure(&mut self, motor: usize, pressure: i32) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        check_range(pressure, 0, MAX_PRESSURE)?;
        channel.config.max_pressure = pressure;
        Ok(())
    }

    pub fn set_open_loop_current(&mut self, motor: usize, current: u16) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        check_range(current as i32, 0, MAX_CURRENT)?;
        channel.config.open_loop_current = current;
        Ok(())
    }

    /// TMC4671 トルク/フラックスPI
    pub fn set_torque_pi(&mut self, motor: usize, p: u16, i: u16) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        check_gain(p)?;
        check_gain(i)?;
        channel.config.torque_p = p;
        channel.config.torque_i = i;
        self.write_torque_pi(motor);
        Ok(())
    }

    /// TMC4671 速度PI
    pub fn set_velocity_pi(&mut self, motor: usize, p: u16, i: u16) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        check_gain(p)?;
        check_gain(i)?;
        channel.config.velocity_p = p;
        channel.config.velocity_i = i;
        self.write_velocity_pi(motor);
        Ok(())
    }

    /// 圧力PI（次周期から有効）
    pub fn set_pressure_pi(&mut self, motor: usize, p: u16, i: u16) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        check_gain(p)?;
        check_gain(i)?;
        channel.config.pressure_p = p;
        channel.config.pressure_i = i;
        Ok(())
    }

    /// 容量PI（次周期から有効）
    pub fn set_volume_pi(&mut self, motor: usize, p: u16, i: u16) -> Result<(), ParamError> {
        let channel = self.channel_mut(motor)?;
        check_gain(p)?;
        check_gain(i)?;
        channel.config.volume_p = p;
        channel.config.volume_i = i;
        Ok(())
    }

    pub fn set_hall_config(&mut self, motor: usize, hall: HallConfig) -> Result<(), ParamError> {
        self.channel_mut(motor)?.config.hall = hall;
        self.write_hall_settings(motor);
        Ok(())
    }

    // ===== 計測値 =====

    /// 電源電圧 [0.1V]
    pub fn supply_voltage(&self) -> i16 {
        self.safety.supply_voltage()
    }

    /// モーター温度 [°C]
    pub fn motor_temperature(&self) -> i16 {
        self.safety.motor_temperature()
    }

    /// フィルタ済み流量 [ml/min]
    pub fn flow_value(&self) -> i32 {
        self.flow.flow_value()
    }

    /// 積算容量 [ml]
    pub fn actual_volume(&self) -> i32 {
        self.flow.volume()
    }

    pub fn flow_sensor_present(&self) -> bool {
        self.flow.is_present()
    }

    /// 流量0点 [ml/min]
    pub fn flow_offset(&self) -> i32 {
        self.flow.flow_offset()
    }

    /// 実行した制御周期の回数
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    // ===== ドライバからの読み戻し =====

    /// 相電流ADCオフセット I0（ドライバから読み戻して設定へ反映）
    pub fn adc_i0_offset(&mut self, motor: usize) -> Result<u16, ParamError> {
        self.channel_mut(motor)?;
        let offset = self.hardware.read_field(motor, fields::ADC_I0_OFFSET) as u16;
        self.motors[motor].config.adc_i0_offset = offset;
        Ok(offset)
    }

    /// 相電流ADCオフセット I1（ドライバから読み戻して設定へ反映）
    pub fn adc_i1_offset(&mut self, motor: usize) -> Result<u16, ParamError> {
        self.channel_mut(motor)?;
        let offset = self.hardware.read_field(motor, fields::ADC_I1_OFFSET) as u16;
        self.motors[motor].config.adc_i1_offset = offset;
        Ok(offset)
    }

    /// ドライバに設定されている目標電流 [mA]（トルク+フラックス）
    ///
    /// オープンループ時はシャフト補正しません。
    pub fn target_motor_current(&mut self, motor: usize) -> Result<i32, ParamError> {
        let config = self.motor(motor)?.config;
        let raw = self.hardware.read_int(motor, Register::PidTorqueFluxTarget);
        let sum = fields::PID_TORQUE_TARGET.extract(raw) + fields::PID_FLUX_TARGET.extract(raw);
        let current = config.raw_to_current(sum);
        if config.commutation_mode == CommutationMode::OpenLoop {
            Ok(current)
        } else {
            Ok(config.shaft_direction.apply(current))
        }
    }

    // ===== ドライバ設定の書き込み =====

    fn write_motor_config(&mut self, motor: usize) {
        let config = self.motors[motor].config;
        self.write_pole_pairs(motor);
        self.hardware
            .write_field(motor, fields::ADC_I0_OFFSET, config.adc_i0_offset as i32);
        self.hardware
            .write_field(motor, fields::ADC_I1_OFFSET, config.adc_i1_offset as i32);
        self.write_current_limit(motor);
        self.write_velocity_limit(motor);
        self.write_torque_pi(motor);
        self.write_velocity_pi(motor);
        self.write_hall_settings(motor);
    }

    fn write_pole_pairs(&mut self, motor: usize) {
        let pole_pairs = self.motors[motor].config.pole_pairs;
        self.hardware
            .write_field(motor, fields::N_POLE_PAIRS, pole_pairs as i32);
    }

    fn write_current_limit(&mut self, motor: usize) {
        let config = &self.motors[motor].config;
        let limit = config.current_to_raw(config.max_current as i32);
        self.hardware
            .write_int(motor, Register::PidTorqueFluxLimits, limit);
    }

    fn write_velocity_limit(&mut self, motor: usize) {
        let config = &self.motors[motor].config;
        let limit = config.max_velocity * config.pole_pairs();
        self.hardware.write_int(motor, Register::PidVelocityLimit, limit);
    }

    fn write_torque_pi(&mut self, motor: usize) {
        let config = self.motors[motor].config;
        let hw = &mut self.hardware;
        hw.write_field(motor, fields::PID_TORQUE_P, config.torque_p as i32);
        hw.write_field(motor, fields::PID_TORQUE_I, config.torque_i as i32);
        hw.write_field(motor, fields::PID_FLUX_P, config.torque_p as i32);
        hw.write_field(motor, fields::PID_FLUX_I, config.torque_i as i32);
    }

    fn write_velocity_pi(&mut self, motor: usize) {
        let config = self.motors[motor].config;
        let hw = &mut self.hardware;
        hw.write_field(motor, fields::PID_VELOCITY_P, config.velocity_p as i32);
        hw.write_field(motor, fields::PID_VELOCITY_I, config.velocity_i as i32);
    }

    fn write_hall_settings(&mut self, motor: usize) {
        let hall = self.motors[motor].config.hall;
        let mut mode = 0;
        if hall.polarity {
            mode |= hall_mode::POLARITY;
        }
        if hall.direction {
            mode |= hall_mode::DIRECTION;
        }
        if hall.interpolation {
            mode |= hall_mode::INTERPOLATION;
        }
        self.hardware.write_field(motor, fields::HALL_MODE, mode);
        self.hardware
            .write_field(motor, fields::HALL_PHI_E_OFFSET, hall.phi_e_offset as i32);
    }
}
