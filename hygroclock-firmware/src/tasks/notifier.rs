//! Online notification task
//!
//! Sends the one-shot "is online" message through the chat relay. The
//! result is logged and never retried.

use defmt::*;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::{self, ConnectError, TcpSocket};
use embassy_net::Stack;
use embassy_time::Duration;
use embedded_io_async::Write;
use heapless::Vec;

use hygroclock_core::notifier::{classify_response, NotifyRequest};
use hygroclock_protocol::relay::{write_post_request, RELAY_PORT};
use hygroclock_protocol::{parse_status_line, FrameError, HttpError, Relay, RELAY_HOST};

use crate::channels::NOTIFY;

/// Request line, headers and the escaped message
const REQUEST_CAPACITY: usize = 512;

/// Only the status line of the reply is needed
const RESPONSE_CAPACITY: usize = 128;

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Notification errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum NotifyError {
    Frame(FrameError),
    Dns,
    Connect(ConnectError),
    Tcp(tcp::Error),
    Http(HttpError),
}

impl From<FrameError> for NotifyError {
    fn from(e: FrameError) -> Self {
        NotifyError::Frame(e)
    }
}

impl From<tcp::Error> for NotifyError {
    fn from(e: tcp::Error) -> Self {
        NotifyError::Tcp(e)
    }
}

/// Notifier task
#[embassy_executor::task]
pub async fn notifier_task(stack: Stack<'static>, relay: Relay<'static>) {
    info!("Notifier task started");

    loop {
        let request = NOTIFY.wait().await;
        info!("Announcing: {}", request.message.as_str());

        match send(stack, relay, &request).await {
            Ok(code) => match classify_response(code) {
                Ok(()) => info!("Relay accepted the notification ({})", code),
                Err(e) => error!("Relay rejected the notification: {:?}", e),
            },
            Err(e) => error!("Notification not sent: {:?}", e),
        }
    }
}

/// POST the message and return the relay's status code
async fn send(
    stack: Stack<'static>,
    relay: Relay<'static>,
    request: &NotifyRequest,
) -> Result<u16, NotifyError> {
    let target = relay.request_target(&request.message)?;
    let mut out: Vec<u8, REQUEST_CAPACITY> = Vec::new();
    write_post_request(&mut out, &target)?;

    let addresses = stack
        .dns_query(RELAY_HOST, DnsQueryType::A)
        .await
        .map_err(|_| NotifyError::Dns)?;
    let host = *addresses.first().ok_or(NotifyError::Dns)?;

    let mut rx_buffer = [0u8; 512];
    let mut tx_buffer = [0u8; REQUEST_CAPACITY];
    let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(RESPONSE_TIMEOUT));
    socket
        .connect((host, RELAY_PORT))
        .await
        .map_err(NotifyError::Connect)?;

    socket.write_all(&out).await?;
    socket.flush().await?;

    let mut response = [0u8; RESPONSE_CAPACITY];
    let mut len = 0;
    let code = loop {
        if len == response.len() {
            return Err(NotifyError::Http(HttpError::Malformed));
        }
        let n = socket.read(&mut response[len..]).await?;
        if n == 0 {
            return Err(NotifyError::Http(HttpError::Incomplete));
        }
        len += n;

        match parse_status_line(&response[..len]) {
            Ok(code) => break code,
            Err(HttpError::Incomplete) => continue,
            Err(e) => return Err(NotifyError::Http(e)),
        }
    };

    socket.close();
    let _ = socket.flush().await;
    Ok(code)
}
