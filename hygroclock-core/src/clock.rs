//! Wall clock
//!
//! The clock advances with the monotonic uptime counter and is re-seeded
//! from network time whenever a fetch succeeds. Until the first seed it
//! counts from the Unix epoch at boot, so the face shows a running clock
//! even without a time source.

use core::fmt::Write;

use heapless::String;

/// Seconds per day
const DAY_S: i64 = 86_400;

/// 1970-01-01 was a Thursday
const EPOCH_WEEKDAY: i64 = 4;

/// Day of the week, Sunday first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Weekday {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl Weekday {
    /// Weekday for an index, wrapping modulo 7
    pub const fn from_index(index: u8) -> Self {
        match index % 7 {
            0 => Weekday::Sunday,
            1 => Weekday::Monday,
            2 => Weekday::Tuesday,
            3 => Weekday::Wednesday,
            4 => Weekday::Thursday,
            5 => Weekday::Friday,
            _ => Weekday::Saturday,
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Full English name
    pub const fn name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }
}

/// Local time at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSnapshot {
    pub day_of_week: Weekday,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// `HH:MM:SS`
    pub formatted: String<8>,
}

impl ClockSnapshot {
    /// Break local seconds since the epoch into a snapshot
    pub fn from_local_secs(local: i64) -> Self {
        let days = local.div_euclid(DAY_S);
        let of_day = local.rem_euclid(DAY_S);

        let hour = (of_day / 3600) as u8;
        let minute = ((of_day % 3600) / 60) as u8;
        let second = (of_day % 60) as u8;

        let mut formatted = String::new();
        // Always 8 characters
        let _ = write!(formatted, "{:02}:{:02}:{:02}", hour, minute, second);

        Self {
            day_of_week: Weekday::from_index((days + EPOCH_WEEKDAY).rem_euclid(7) as u8),
            hour,
            minute,
            second,
            formatted,
        }
    }
}

/// Clock seeded from network time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSync {
    /// Local offset from UTC (s)
    offset_s: i32,
    /// Unix time (ms) at `seed_at_ms` uptime
    seed_unix_ms: u64,
    /// Uptime (ms) when the seed was taken
    seed_at_ms: u64,
    synced: bool,
}

impl ClockSync {
    /// Create an unseeded clock
    pub const fn new(offset_s: i32) -> Self {
        Self {
            offset_s,
            seed_unix_ms: 0,
            seed_at_ms: 0,
            synced: false,
        }
    }

    /// Re-seed from a network time fetch taken at uptime `at_ms`
    pub fn seed(&mut self, unix_secs: u64, at_ms: u64) {
        self.seed_unix_ms = unix_secs.saturating_mul(1000);
        self.seed_at_ms = at_ms;
        self.synced = true;
    }

    /// Whether at least one seed has been applied
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn offset_s(&self) -> i32 {
        self.offset_s
    }

    /// Unix time in seconds at uptime `now_ms`
    pub fn unix_secs(&self, now_ms: u64) -> u64 {
        let elapsed = now_ms.saturating_sub(self.seed_at_ms);
        (self.seed_unix_ms + elapsed) / 1000
    }

    /// Derive the local-time snapshot for uptime `now_ms`
    pub fn tick(&self, now_ms: u64) -> ClockSnapshot {
        let local = self.unix_secs(now_ms) as i64 + self.offset_s as i64;
        ClockSnapshot::from_local_secs(local)
    }
}
