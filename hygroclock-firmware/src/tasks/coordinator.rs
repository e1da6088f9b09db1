//! Coordinator task
//!
//! Owns the scheduler, and with it the sensor, display, clock and
//! broadcaster. Each iteration drains the mailboxes, runs the scheduler
//! once and logs what it reported.

use defmt::*;
use embassy_rp::gpio::OutputOpenDrain;
use embassy_rp::i2c::{Blocking, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_time::{Delay, Duration, Instant, Ticker};

use hygroclock_core::broadcast::SubscribeReport;
use hygroclock_core::scheduler::{RenderOutcome, Scheduler, TickReport};
use hygroclock_core::CoordinatorError;
use hygroclock_display::Ssd1306;
use hygroclock_drivers::sensor::Dht22;

use crate::channels::{
    Subscription, CLOCK_SEED, READINGS_REQUEST, READINGS_RESPONSE, SUBSCRIPTIONS,
};
use crate::sink::{release_slot, OutboxSink};

/// Loop period in milliseconds
pub const TICK_INTERVAL_MS: u64 = 200;

pub type DeviceSensor = Dht22<OutputOpenDrain<'static>, Delay, fn() -> u64>;
pub type DeviceDisplay = Ssd1306<I2c<'static, I2C0, Blocking>>;
pub type DeviceScheduler = Scheduler<DeviceSensor, DeviceDisplay, OutboxSink>;

/// Uptime in milliseconds
pub fn uptime_ms() -> u64 {
    Instant::now().as_millis()
}

/// Coordinator task - the cooperative control loop
#[embassy_executor::task]
pub async fn coordinator_task(mut scheduler: DeviceScheduler) {
    info!("Coordinator task started");

    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS));

    loop {
        while let Ok(notice) = SUBSCRIPTIONS.try_receive() {
            handle_subscription(&mut scheduler, notice);
        }

        if let Some(seed) = CLOCK_SEED.try_take() {
            scheduler.seed_clock(seed.unix_secs, seed.at_ms);
            debug!("Clock seeded: {} s at uptime {} ms", seed.unix_secs, seed.at_ms);
        }

        if READINGS_REQUEST.try_take().is_some() {
            READINGS_RESPONSE.signal(scheduler.query_readings());
        }

        let report = scheduler.run_iteration(uptime_ms());
        log_report(&report);

        ticker.next().await;
    }
}

fn handle_subscription(scheduler: &mut DeviceScheduler, notice: Subscription) {
    match notice {
        Subscription::Open {
            connection,
            resume_from,
        } => match scheduler.on_subscribe(connection, resume_from) {
            Ok(report) => log_subscribe(&report),
            Err(e) => warn!("Client {} not subscribed: {:?}", connection.0, e),
        },
        Subscription::Closed(connection) => {
            if scheduler.on_unsubscribe(connection) {
                info!("Client {} disconnected", connection.0);
            }
            // Nothing reaches this slot's outbox from here on
            release_slot(connection);
        }
    }
}

fn log_subscribe(report: &SubscribeReport) {
    let client = report.connection.0;
    match report.resumed_from {
        Some(last_id) => info!(
            "Client {} reconnected, last id {}: replayed {} event(s)",
            client, last_id, report.replayed
        ),
        None => info!("Client {} subscribed", client),
    }
    if report.gap {
        warn!("Client {} missed events no longer retained", client);
    }
    if report.failed > 0 {
        warn!("Client {} refused {} frame(s)", client, report.failed);
    }
}

fn log_report(report: &TickReport) {
    if let Some(poll) = &report.poll {
        match &poll.ping {
            Ok(push) if push.failed > 0 => warn!(
                "ping #{} refused by {} connection(s)",
                push.id, push.failed
            ),
            Ok(push) => trace!("ping #{} to {} client(s)", push.id, push.delivered),
            Err(e) => warn!("ping not pushed: {:?}", e),
        }

        match &poll.readings {
            Ok(push) => debug!(
                "Reading {}% {}C pushed as #{} to {} client(s)",
                poll.reading.humidity, poll.reading.temperature, push.id, push.delivered
            ),
            Err(CoordinatorError::SensorUnavailable(cause)) => {
                warn!("Sensor unavailable: {:?}", cause)
            }
            Err(e) => warn!("new_readings not pushed: {:?}", e),
        }
    }

    if let RenderOutcome::Failed(e) = &report.render {
        warn!("Frame skipped: {:?}", e);
    }
}
