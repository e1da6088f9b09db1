//! Network time task
//!
//! Fetches the time from `pool.ntp.org` once the device is online and
//! again every resync interval. Each result goes to the coordinator as a
//! clock seed; a failed fetch is retried sooner.

use defmt::*;
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::Stack;
use embassy_time::{with_timeout, Duration, Instant, Timer};

use hygroclock_protocol::sntp::{self, SntpError, NTP_PORT};

use crate::channels::{ClockSeed, CLOCK_SEED};

const NTP_HOST: &str = "pool.ntp.org";

/// How long to wait for the server's answer
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

/// Delay before retrying a failed fetch
const RETRY_DELAY: Duration = Duration::from_secs(30);

/// Time sync errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum SyncError {
    /// Host name did not resolve
    Dns,
    /// Socket could not be bound or used
    Socket,
    /// No answer in time
    Timeout,
    /// Answer was unusable
    Response(SntpError),
}

/// Time sync task
#[embassy_executor::task]
pub async fn time_sync_task(stack: Stack<'static>, resync_interval_ms: u32) -> ! {
    info!("Time sync task started");

    loop {
        let delay = match fetch_time(stack).await {
            Ok(seed) => {
                info!("SNTP: {} s since the epoch", seed.unix_secs);
                CLOCK_SEED.signal(seed);
                Duration::from_millis(u64::from(resync_interval_ms))
            }
            Err(e) => {
                warn!("SNTP fetch failed: {:?}", e);
                RETRY_DELAY
            }
        };
        Timer::after(delay).await;
    }
}

async fn fetch_time(stack: Stack<'static>) -> Result<ClockSeed, SyncError> {
    let addresses = stack
        .dns_query(NTP_HOST, DnsQueryType::A)
        .await
        .map_err(|_| SyncError::Dns)?;
    let server = *addresses.first().ok_or(SyncError::Dns)?;
    debug!("SNTP: querying {}", server);

    let mut rx_meta = [PacketMetadata::EMPTY; 1];
    let mut rx_buffer = [0u8; 128];
    let mut tx_meta = [PacketMetadata::EMPTY; 1];
    let mut tx_buffer = [0u8; 128];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    socket.bind(0).map_err(|_| SyncError::Socket)?;

    socket
        .send_to(&sntp::request_packet(), (server, NTP_PORT))
        .await
        .map_err(|_| SyncError::Socket)?;

    let mut packet = [0u8; 128];
    let (len, _) = with_timeout(RESPONSE_TIMEOUT, socket.recv_from(&mut packet))
        .await
        .map_err(|_| SyncError::Timeout)?
        .map_err(|_| SyncError::Socket)?;
    let at_ms = Instant::now().as_millis();

    let unix_secs = sntp::parse_response(&packet[..len]).map_err(SyncError::Response)?;
    Ok(ClockSeed { unix_secs, at_ms })
}
