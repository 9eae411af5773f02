//! 制御タスク
//!
//! 制御コアを所有し、1ms より短い周期でポーリングします。
//! 1ms 毎の実処理の判定は制御コア側で行います。

use blower_regulator::Controller;
use embassy_time::Ticker;

use crate::board::Board;
use crate::config::{self, regulation::STATUS_PUBLISH_INTERVAL};
use crate::fmt::*;
use crate::state::{RegulationStatus, REGULATION_STATUS};

const MOTOR: usize = 0;

/// 制御タスク
#[embassy_executor::task]
pub async fn regulation_task(board: Board) {
    info!("Regulation task started");

    let mut controller: Controller<Board> = Controller::with_config(board, [config::MOTOR_CONFIG]);
    controller.init();

    if !controller.flow_sensor_present() {
        warn!("Running without flow sensor");
    }

    match controller.enable_driver(MOTOR) {
        Ok(()) => info!("Driver enabled"),
        Err(e) => error!("Driver enable refused: {}", e),
    }

    let mut ticker = Ticker::every(config::regulation::POLL_PERIOD);
    let mut publish_counter = 0u32;

    loop {
        ticker.next().await;

        controller.process_tick();

        publish_counter += 1;
        if publish_counter >= STATUS_PUBLISH_INTERVAL {
            publish_counter = 0;
            *REGULATION_STATUS.lock().await = snapshot(&controller);

            let spi_errors = controller.hardware().spi_errors();
            if spi_errors > 0 {
                debug!("SPI errors so far: {}", spi_errors);
            }
        }
    }
}

fn snapshot(controller: &Controller<Board>) -> RegulationStatus {
    let mut status = RegulationStatus::new();
    status.supply_voltage = controller.supply_voltage();
    status.motor_temperature = controller.motor_temperature();
    status.actual_volume = controller.actual_volume();

    if let Ok(motor) = controller.motor(MOTOR) {
        let state = motor.state();
        status.motion_mode = state.motion_mode;
        status.initialized = state.initialized;
        status.overvoltage = state.overvoltage;
        status.undervoltage = state.undervoltage;
        status.overtemperature = state.overtemperature;
        status.actual_velocity = motor.actual_velocity();
        status.actual_pressure = motor.actual_pressure();
    }
    status
}
