//! Hygroclock - Climate Clock Firmware
//!
//! Raspberry Pi Pico W with a DHT22 and a 128x64 SSD1306. Shows the day
//! and an SNTP-disciplined clock next to the last reading, and pushes
//! readings to browsers over Server-Sent Events.
//!
//! Boot runs in two phases. The association phase joins the network and
//! waits for an address while the display shows a banner. Then the
//! coordinator loop and the network tasks take over.

#![no_std]
#![no_main]

use cyw43::JoinOptions;
use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_net::{Config, DhcpConfig, Stack, StackResources};
use embassy_rp::bind_interrupts;
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output, OutputOpenDrain};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_time::{Delay, Duration, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use hygroclock_core::config::DeviceConfig;
use hygroclock_core::scheduler::{LinkOutcome, Scheduler};
use hygroclock_core::state::{DeviceAddress, LinkEvent};
use hygroclock_core::CoordinatorError;
use hygroclock_display::Ssd1306;
use hygroclock_drivers::sensor::Dht22;

use crate::channels::NOTIFY;
use crate::sink::OutboxSink;
use crate::tasks::coordinator::uptime_ms;
use crate::tasks::DeviceScheduler;

mod channels;
mod config;
mod sink;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

/// HTTP workers, SNTP, DNS, the notifier and DHCP
const SOCKET_COUNT: usize = tasks::HTTP_WORKERS + 4;

/// Delay between association attempts
const JOIN_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Polling period while waiting for a DHCP lease
const DHCP_POLL: Duration = Duration::from_millis(500);

/// I2C clock for the display
const I2C_FREQUENCY: u32 = 400_000;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Hygroclock firmware starting...");

    let device = &config::DEVICE;
    if let Err(e) = device.validate() {
        error!("Invalid device configuration: {:?}", e);
        halt();
    }

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Display on I2C0 (SDA GPIO4, SCL GPIO5)
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = I2C_FREQUENCY;
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c_config);
    let mut display = Ssd1306::new(i2c);
    if let Err(e) = display.init() {
        error!("Display init failed: {:?}", e);
        halt();
    }
    info!("Display initialized");

    // DHT22 data on GPIO15; the module carries its own pull-up
    let dht_pin = OutputOpenDrain::new(p.PIN_15, Level::High);
    let sensor = Dht22::new(dht_pin, Delay, uptime_ms as fn() -> u64);

    let mut scheduler: DeviceScheduler = Scheduler::new(device, sensor, display, OutboxSink);
    if let Err(e) = scheduler.boot() {
        error!("Boot banner failed: {:?}", e);
        if e.is_fatal_at_boot() {
            halt();
        }
    }

    // CYW43 on PIO0: power GPIO23, CS GPIO25, data GPIO24, clock GPIO29
    let fw = include_bytes!("../cyw43-firmware/43439A0.bin");
    let clm = include_bytes!("../cyw43-firmware/43439A0_clm.bin");

    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );

    static STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    spawner.spawn(tasks::cyw43_task(runner)).unwrap();

    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;
    info!("Wi-Fi chip initialized");

    let mut dhcp_config = DhcpConfig::default();
    dhcp_config.hostname = heapless::String::try_from(device.name).ok();

    let mut rng = RoscRng;
    static RESOURCES: StaticCell<StackResources<SOCKET_COUNT>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        net_device,
        Config::dhcpv4(dhcp_config),
        RESOURCES.init(StackResources::new()),
        rng.next_u64(),
    );
    spawner.spawn(tasks::net_task(runner)).unwrap();

    associate(&mut control, stack, &mut scheduler, device).await;

    spawner.spawn(tasks::coordinator_task(scheduler)).unwrap();
    spawner
        .spawn(tasks::time_sync_task(
            stack,
            device.timing.resync_interval_ms,
        ))
        .unwrap();
    spawner
        .spawn(tasks::notifier_task(stack, device.relay.relay()))
        .unwrap();
    for worker in 0..tasks::HTTP_WORKERS {
        spawner.spawn(tasks::http_task(stack, worker)).unwrap();
    }

    info!("All tasks spawned, firmware running");
}

/// Join the network and wait for an address
///
/// Blocks until both succeed; failures are retried indefinitely.
async fn associate(
    control: &mut cyw43::Control<'static>,
    stack: Stack<'static>,
    scheduler: &mut DeviceScheduler,
    device: &DeviceConfig,
) {
    info!("Joining {}", device.wifi_ssid);
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let options = if device.wifi_password.is_empty() {
            JoinOptions::new_open()
        } else {
            JoinOptions::new(device.wifi_password.as_bytes())
        };
        match control.join(device.wifi_ssid, options).await {
            Ok(()) => break,
            Err(e) => {
                warn!(
                    "Join attempt {} failed: status={} ({:?})",
                    attempt,
                    e.status,
                    CoordinatorError::NetworkUnreachable
                );
                Timer::after(JOIN_RETRY_DELAY).await;
            }
        }
    }
    info!("Joined {} after {} attempt(s)", device.wifi_ssid, attempt);
    log_link(&scheduler.apply_link_event(LinkEvent::AssociationSucceeded, uptime_ms()));

    info!("Waiting for DHCP...");
    let address = loop {
        if let Some(config) = stack.config_v4() {
            break DeviceAddress::from(config.address.address());
        }
        Timer::after(DHCP_POLL).await;
    };
    info!("Address acquired: {}", address.0);

    let outcome = scheduler.apply_link_event(LinkEvent::AddressAcquired(address), uptime_ms());
    log_link(&outcome);
    if let Some(request) = outcome.notification {
        NOTIFY.signal(request);
    }
}

fn log_link(outcome: &LinkOutcome) {
    info!("Connectivity: {:?} -> {:?}", outcome.previous, outcome.state);
    if let Err(e) = outcome.banner {
        warn!("Banner not shown: {:?}", e);
    }
}

/// Stop here; only reached on unrecoverable boot failures
fn halt() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}
