//! LED制御タスク
//!
//! 制御ステータスをLEDで表示します。
//! LED1: ハートビート、LED2: 転流初期化済み、LED3: 電圧/温度異常（アクティブLow）

use blower_regulator::MotionMode;
use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Timer};

use crate::fmt::*;
use crate::state::REGULATION_STATUS;

/// LED制御タスク
#[embassy_executor::task]
pub async fn led_task(
    mut led1: Output<'static>,
    mut led2: Output<'static>,
    mut led3: Output<'static>,
) {
    info!("LED task started");

    let mut fault_reported = false;

    loop {
        let status = *REGULATION_STATUS.lock().await;

        // 運転中は速く点滅
        let half_period = if status.motion_mode == MotionMode::Stop {
            Duration::from_millis(500)
        } else {
            Duration::from_millis(100)
        };

        if status.initialized {
            led2.set_low();
        } else {
            led2.set_high();
        }

        if status.has_fault() {
            led3.set_low();
            if !fault_reported {
                warn!(
                    "Fault: OV={}, UV={}, OT={}, V={} [0.1V], T={} C",
                    status.overvoltage,
                    status.undervoltage,
                    status.overtemperature,
                    status.supply_voltage,
                    status.motor_temperature
                );
                fault_reported = true;
            }
        } else {
            led3.set_high();
            fault_reported = false;
        }

        led1.set_low();
        Timer::after(half_period).await;
        led1.set_high();
        Timer::after(half_period).await;
    }
}
