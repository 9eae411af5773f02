#![no_std]
#![no_main]

// This must go first so the macros are visible to every other module
mod fmt;

mod board;
mod config;
mod flow_sensor;
mod hardware;
mod state;
mod tasks;
mod tmc4671;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};

use fmt::*;
use tasks::{led_task, regulation_task};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // ハードウェア初期化
    let clock_config = hardware::create_clock_config();
    let p = embassy_stm32::init(clock_config);

    info!("═══════════════════════════════════════════════════════════════════");
    info!("        Blower Regulator • TMC4671 • STM32G431VB @ 170MHz");
    info!("═══════════════════════════════════════════════════════════════════");

    let (board, leds) = hardware::init_peripherals(p);

    // LEDタスク起動
    spawner.spawn(unwrap!(led_task(leds.led1, leds.led2, leds.led3)));

    // 制御タスク起動（ボードの所有権を渡す）
    info!("Starting regulation...");
    spawner.spawn(unwrap!(regulation_task(board)));

    // メインループ（将来の拡張用）
    loop {
        Timer::after(Duration::from_millis(100)).await;
    }
}
