//! Chat relay requests
//!
//! Connectivity announcements go out through the CallMeBot HTTP relay,
//! which forwards a text message to a Telegram user or WhatsApp number.
//! The message travels in the query string, so it is percent-encoded here.

use heapless::{String, Vec};

use crate::put;
use crate::sse::FrameError;

/// Host serving both relay endpoints
pub const RELAY_HOST: &str = "api.callmebot.com";

/// Port the relay is reached on
pub const RELAY_PORT: u16 = 80;

/// Longest request target we build
pub const MAX_TARGET_LEN: usize = 256;

/// Relay destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Relay<'a> {
    /// Telegram user name, with or without the leading `@`
    Telegram { user: &'a str },
    /// WhatsApp number in international format plus the relay API key
    WhatsApp { phone: &'a str, api_key: &'a str },
}

impl Relay<'_> {
    /// Build the path and query for `message`
    pub fn request_target(&self, message: &str) -> Result<String<MAX_TARGET_LEN>, FrameError> {
        let mut out: Vec<u8, MAX_TARGET_LEN> = Vec::new();
        match self {
            Relay::Telegram { user } => {
                put(&mut out, b"/text.php?user=")?;
                url_escape_into(&mut out, user)?;
                put(&mut out, b"&text=")?;
                url_escape_into(&mut out, message)?;
                put(&mut out, b"&html=no&links=no")?;
            }
            Relay::WhatsApp { phone, api_key } => {
                put(&mut out, b"/whatsapp.php?phone=")?;
                url_escape_into(&mut out, phone)?;
                put(&mut out, b"&apikey=")?;
                url_escape_into(&mut out, api_key)?;
                put(&mut out, b"&text=")?;
                url_escape_into(&mut out, message)?;
            }
        }
        // Only ASCII was written above
        String::from_utf8(out).map_err(|_| FrameError::InvalidField)
    }
}

/// Percent-encode `text` into `out`
///
/// Unreserved characters (`A-Z a-z 0-9 - _ . ~`) pass through; every other
/// byte, including space, becomes `%XX`.
pub fn url_escape_into<const N: usize>(out: &mut Vec<u8, N>, text: &str) -> Result<(), FrameError> {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    for &b in text.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            put(out, &[b])?;
        } else {
            put(out, &[b'%', HEX[(b >> 4) as usize], HEX[(b & 0x0F) as usize]])?;
        }
    }
    Ok(())
}

/// Write the complete POST request for `target`
pub fn write_post_request<const N: usize>(
    out: &mut Vec<u8, N>,
    target: &str,
) -> Result<(), FrameError> {
    put(out, b"POST ")?;
    put(out, target.as_bytes())?;
    put(out, b" HTTP/1.1\r\nHost: ")?;
    put(out, RELAY_HOST.as_bytes())?;
    put(
        out,
        b"\r\nContent-Type: application/x-www-form-urlencoded\r\n\
Content-Length: 0\r\nConnection: close\r\n\r\n",
    )
}

/// Whether a relay status code means the message was accepted
pub const fn is_success(code: u16) -> bool {
    code >= 200 && code < 300
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_telegram_target() {
        let relay = Relay::Telegram { user: "@ana" };
        let target = relay.request_target("clock /192.168.1.40 is online").unwrap();
        assert_eq!(
            target.as_str(),
            "/text.php?user=%40ana&text=clock%20%2F192.168.1.40%20is%20online&html=no&links=no"
        );
    }

    #[test]
    fn test_whatsapp_target() {
        let relay = Relay::WhatsApp {
            phone: "+351900000000",
            api_key: "123456",
        };
        let target = relay.request_target("up").unwrap();
        assert_eq!(
            target.as_str(),
            "/whatsapp.php?phone=%2B351900000000&apikey=123456&text=up"
        );
    }

    #[test]
    fn test_non_ascii_escaped_bytewise() {
        let mut out: Vec<u8, 16> = Vec::new();
        url_escape_into(&mut out, "ºC").unwrap();
        assert_eq!(&out[..], b"%C2%BAC");
    }

    #[test]
    fn test_target_too_long() {
        let relay = Relay::Telegram { user: "u" };
        let long = [b'x'; 300];
        let message = core::str::from_utf8(&long).unwrap();
        assert_eq!(
            relay.request_target(message),
            Err(FrameError::BufferTooSmall)
        );
    }

    #[test]
    fn test_post_request() {
        let mut out: Vec<u8, 256> = Vec::new();
        write_post_request(&mut out, "/text.php?user=a&text=b").unwrap();
        let text = core::str::from_utf8(&out).unwrap();
        assert!(text.starts_with("POST /text.php?user=a&text=b HTTP/1.1\r\n"));
        assert!(text.contains("Host: api.callmebot.com\r\n"));
        assert!(text.contains("Content-Type: application/x-www-form-urlencoded\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_success_codes() {
        assert!(is_success(200));
        assert!(is_success(204));
        assert!(!is_success(302));
        assert!(!is_success(403));
        assert!(!is_success(500));
    }

    proptest! {
        #[test]
        fn escaped_output_is_query_safe(s in "\\PC{0,40}") {
            let mut out: Vec<u8, 512> = Vec::new();
            url_escape_into(&mut out, &s).unwrap();
            prop_assert!(out.iter().all(|&b| b.is_ascii_alphanumeric()
                || matches!(b, b'-' | b'_' | b'.' | b'~' | b'%')));
        }
    }
}
