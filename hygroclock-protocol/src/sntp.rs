//! SNTP client packets (RFC 4330)
//!
//! Only the unicast client exchange is supported: a 48-byte request with
//! `LI = 0, VN = 3, Mode = 3` and the transmit timestamp taken from the
//! server's reply.

/// Size of an SNTP packet without extension fields
pub const NTP_PACKET_SIZE: usize = 48;

/// Well-known SNTP port
pub const NTP_PORT: u16 = 123;

/// Seconds between 1900-01-01 (NTP epoch) and 1970-01-01 (Unix epoch)
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// First byte of a client request: LI 0, version 3, mode 3 (client)
const CLIENT_HEADER: u8 = 0x1B;

/// Offset of the transmit timestamp seconds field
const TRANSMIT_SECS: usize = 40;

/// Errors that can occur while decoding a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SntpError {
    /// Reply shorter than a full packet
    TooShort,
    /// Reply is not in server mode
    NotServerMode,
    /// Kiss-o'-Death (stratum 0); the server asks us to back off
    KissOfDeath,
    /// Server sent an empty transmit timestamp
    ZeroTimestamp,
}

/// Build a client request packet
pub fn request_packet() -> [u8; NTP_PACKET_SIZE] {
    let mut packet = [0u8; NTP_PACKET_SIZE];
    packet[0] = CLIENT_HEADER;
    packet
}

/// Decode a server reply into whole Unix seconds
pub fn parse_response(buf: &[u8]) -> Result<u64, SntpError> {
    if buf.len() < NTP_PACKET_SIZE {
        return Err(SntpError::TooShort);
    }

    let mode = buf[0] & 0x07;
    if mode != 4 {
        return Err(SntpError::NotServerMode);
    }
    if buf[1] == 0 {
        return Err(SntpError::KissOfDeath);
    }

    let secs = u32::from_be_bytes([
        buf[TRANSMIT_SECS],
        buf[TRANSMIT_SECS + 1],
        buf[TRANSMIT_SECS + 2],
        buf[TRANSMIT_SECS + 3],
    ]) as u64;
    if secs == 0 {
        return Err(SntpError::ZeroTimestamp);
    }

    // Era 1 starts in 2036; timestamps below the Unix offset belong to it
    let secs = if secs < NTP_UNIX_OFFSET {
        secs + (1u64 << 32)
    } else {
        secs
    };
    Ok(secs - NTP_UNIX_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(stratum: u8, transmit: u32) -> [u8; NTP_PACKET_SIZE] {
        let mut buf = [0u8; NTP_PACKET_SIZE];
        buf[0] = 0x1C; // LI 0, VN 3, mode 4
        buf[1] = stratum;
        buf[TRANSMIT_SECS..TRANSMIT_SECS + 4].copy_from_slice(&transmit.to_be_bytes());
        buf
    }

    #[test]
    fn test_request_header() {
        let packet = request_packet();
        assert_eq!(packet[0], 0x1B);
        assert!(packet[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_parse_unix_time() {
        // 2024-01-01T00:00:00Z
        let ntp = (1_704_067_200u64 + NTP_UNIX_OFFSET) as u32;
        assert_eq!(parse_response(&reply(2, ntp)), Ok(1_704_067_200));
    }

    #[test]
    fn test_parse_era_rollover() {
        // Era 1 began at 2036-02-07T06:28:16Z; second 16 of it wraps to 16
        assert_eq!(
            parse_response(&reply(1, 16)),
            Ok((1u64 << 32) + 16 - NTP_UNIX_OFFSET)
        );
    }

    #[test]
    fn test_rejects_bad_replies() {
        assert_eq!(parse_response(&[0u8; 12]), Err(SntpError::TooShort));
        assert_eq!(
            parse_response(&request_packet()),
            Err(SntpError::NotServerMode)
        );
        assert_eq!(parse_response(&reply(0, 1)), Err(SntpError::KissOfDeath));
        assert_eq!(parse_response(&reply(2, 0)), Err(SntpError::ZeroTimestamp));
    }
}
