//! BPC - BIOS POST Code Monitor Firmware
//!
//! Main firmware binary for RP2040-based UART bridges. Listens on UART0 RX
//! (GPIO1) to the POST code byte stream of a booting PC and publishes
//! every code as a sensor reading.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{self, BufferedInterruptHandler, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use bpc_core::config::{parse_config, MonitorConfig};
use bpc_hal::{DataBits, Parity, StopBits, UartConfig};

/// Embedded configuration (compiled into firmware)
/// Edit post_codes.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../post_codes.toml");

mod channels;
mod clock;
mod sensors;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 16]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

// Configuration is borrowed by the POST code task for its whole life
static MONITOR_CONFIG: StaticCell<MonitorConfig> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("BPC firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = MONITOR_CONFIG.init(load_config());

    let tx_buf = TX_BUF.init([0u8; 16]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    // TX is wired but unused; the POST code port is receive-only
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, rp_uart_config(&config.uart));
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (_tx, rx) = uart.split();

    info!(
        "UART initialized: {} baud, {:?} {:?} {:?}",
        config.uart.baudrate, config.uart.data_bits, config.uart.parity, config.uart.stop_bits
    );

    // Spawn tasks
    spawner.spawn(tasks::report_task()).unwrap();
    spawner.spawn(tasks::post_code_task(rx, config)).unwrap();

    info!("All tasks spawned, firmware running");

    // Keeps `_tx` alive; all work happens in spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Parse the embedded post_codes.toml
///
/// build.rs runs the same parser over the same file and fails the build on
/// error, so the fallback to an empty table is unreachable in practice.
fn load_config() -> MonitorConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!(
                "Parsed embedded configuration: {} descriptions, {} ignored codes",
                config.codes.len(),
                config.ignore.len()
            );
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using empty code table");
            MonitorConfig::default()
        }
    }
}

/// Map the board-agnostic serial settings onto the RP2040 UART
fn rp_uart_config(config: &UartConfig) -> uart::Config {
    let mut cfg = uart::Config::default();
    cfg.baudrate = config.baudrate;
    cfg.data_bits = match config.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
    };
    cfg.parity = match config.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    cfg.stop_bits = match config.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    cfg
}
