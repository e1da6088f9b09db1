//! HTTP server tasks
//!
//! A pool of workers accepts on port 80. Each serves one connection at a
//! time:
//!
//! - `GET /` returns the compiled-in index page
//! - `GET /readings` asks the coordinator for a fresh reading
//! - `GET /events` holds the connection open as a push channel

use defmt::*;
use embassy_net::tcp::{self, TcpSocket};
use embassy_net::Stack;
use embassy_time::Duration;
use embedded_io_async::Write;
use heapless::Vec;

use hygroclock_core::broadcast::{EventId, MAX_SUBSCRIBERS};
use hygroclock_core::traits::ConnectionId;
use hygroclock_protocol::http::{write_response_head, EVENT_STREAM_HEAD, MAX_REQUEST_HEAD};
use hygroclock_protocol::{parse_request, FrameError, HttpError, Method, Request, Status};

use crate::channels::{
    Subscription, OUTBOXES, READINGS_LOCK, READINGS_REQUEST, READINGS_RESPONSE, SUBSCRIPTIONS,
};
use crate::sink::claim_slot;

/// Workers: one per push-channel slot plus one for plain requests
pub const HTTP_WORKERS: usize = MAX_SUBSCRIBERS + 1;

const HTTP_PORT: u16 = 80;

/// TCP buffer size per direction
const SOCKET_BUFFER_SIZE: usize = 1024;

/// Idle limit while a request is being read or answered
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

static INDEX_HTML: &[u8] = include_bytes!("../../assets/index.html");

const SENSOR_UNAVAILABLE_BODY: &[u8] = b"{\"error\":\"sensor unavailable\"}";

/// Why a connection ended early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum ServeError {
    Tcp(tcp::Error),
    Frame(FrameError),
    BadRequest,
    /// Peer closed before sending a full request
    Closed,
}

impl From<tcp::Error> for ServeError {
    fn from(e: tcp::Error) -> Self {
        ServeError::Tcp(e)
    }
}

impl From<FrameError> for ServeError {
    fn from(e: FrameError) -> Self {
        ServeError::Frame(e)
    }
}

/// HTTP worker task
#[embassy_executor::task(pool_size = HTTP_WORKERS)]
pub async fn http_task(stack: Stack<'static>, worker: usize) -> ! {
    info!("HTTP worker {} started", worker);

    let mut rx_buffer = [0u8; SOCKET_BUFFER_SIZE];
    let mut tx_buffer = [0u8; SOCKET_BUFFER_SIZE];
    let mut head = [0u8; MAX_REQUEST_HEAD];

    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(REQUEST_TIMEOUT));

        if let Err(e) = socket.accept(HTTP_PORT).await {
            warn!("HTTP worker {}: accept failed: {:?}", worker, e);
            continue;
        }
        trace!("HTTP worker {}: accepted {:?}", worker, socket.remote_endpoint());

        if let Err(e) = serve(&mut socket, &mut head, worker).await {
            debug!("HTTP worker {}: connection ended: {:?}", worker, e);
        }

        socket.close();
        let _ = socket.flush().await;
    }
}

async fn serve(
    socket: &mut TcpSocket<'_>,
    head: &mut [u8],
    worker: usize,
) -> Result<(), ServeError> {
    let request = read_request(socket, head).await?;
    debug!(
        "HTTP worker {}: {:?} {}",
        worker, request.method, request.path
    );

    match (request.method, request.path) {
        (Method::Get, "/") => {
            respond(socket, Status::Ok, "text/html; charset=utf-8", INDEX_HTML).await
        }
        (Method::Get, "/readings") => serve_readings(socket).await,
        (Method::Get, "/events") => serve_events(socket, request.last_event_id).await,
        (Method::Get, _) => respond(socket, Status::NotFound, "text/plain", b"not found").await,
        _ => {
            respond(
                socket,
                Status::MethodNotAllowed,
                "text/plain",
                b"method not allowed",
            )
            .await
        }
    }
}

/// Read until the request head is complete
async fn read_request<'b>(
    socket: &mut TcpSocket<'_>,
    buf: &'b mut [u8],
) -> Result<Request<'b>, ServeError> {
    let mut len = 0;
    loop {
        if len == buf.len() {
            return Err(ServeError::BadRequest);
        }
        let n = socket.read(&mut buf[len..]).await?;
        if n == 0 {
            return Err(ServeError::Closed);
        }
        len += n;

        match parse_request(&buf[..len]) {
            Ok(_) => break,
            Err(HttpError::Incomplete) => continue,
            Err(HttpError::Malformed) => return Err(ServeError::BadRequest),
        }
    }
    parse_request(&buf[..len]).map_err(|_| ServeError::BadRequest)
}

async fn respond(
    socket: &mut TcpSocket<'_>,
    status: Status,
    content_type: &str,
    body: &[u8],
) -> Result<(), ServeError> {
    let mut head: Vec<u8, 160> = Vec::new();
    write_response_head(&mut head, status, content_type, Some(body.len()))?;
    socket.write_all(&head).await?;
    socket.write_all(body).await?;
    socket.flush().await?;
    Ok(())
}

/// Answer `/readings` with a reading taken just now
async fn serve_readings(socket: &mut TcpSocket<'_>) -> Result<(), ServeError> {
    let answer = {
        let _guard = READINGS_LOCK.lock().await;
        READINGS_RESPONSE.reset();
        READINGS_REQUEST.signal(());
        READINGS_RESPONSE.wait().await
    };

    match answer {
        Ok(encoded) => respond(socket, Status::Ok, "application/json", encoded.as_bytes()).await,
        Err(e) => {
            warn!("/readings: {:?}", e);
            respond(
                socket,
                Status::ServiceUnavailable,
                "application/json",
                SENSOR_UNAVAILABLE_BODY,
            )
            .await
        }
    }
}

/// Hold the connection open as a push channel
async fn serve_events(
    socket: &mut TcpSocket<'_>,
    resume_from: Option<EventId>,
) -> Result<(), ServeError> {
    let Some(connection) = claim_slot() else {
        warn!("Push channel full, refusing client");
        return respond(
            socket,
            Status::ServiceUnavailable,
            "text/plain",
            b"too many subscribers",
        )
        .await;
    };

    let result = stream_events(socket, connection, resume_from).await;

    // The coordinator frees the slot once it has dropped the subscriber
    SUBSCRIPTIONS.send(Subscription::Closed(connection)).await;
    result
}

async fn stream_events(
    socket: &mut TcpSocket<'_>,
    connection: ConnectionId,
    resume_from: Option<EventId>,
) -> Result<(), ServeError> {
    // Leftovers from the slot's previous owner
    let outbox = &OUTBOXES[usize::from(connection.0)];
    while outbox.try_receive().is_ok() {}

    // Pings keep the connection busy; a dead peer shows up as a write error
    socket.set_timeout(None);
    socket.write_all(EVENT_STREAM_HEAD.as_bytes()).await?;
    socket.flush().await?;

    SUBSCRIPTIONS
        .send(Subscription::Open {
            connection,
            resume_from,
        })
        .await;

    loop {
        let frame = outbox.receive().await;
        socket.write_all(&frame).await?;
        socket.flush().await?;
    }
}
