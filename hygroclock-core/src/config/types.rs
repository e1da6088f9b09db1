//! Configuration type definitions
//!
//! All strings are `&'static str` because the configuration is baked into
//! the firmware image.

use hygroclock_protocol::Relay;

/// Largest timezone offset accepted, in seconds (UTC-14 .. UTC+14)
pub const MAX_TZ_OFFSET_S: i32 = 14 * 3600;

/// What the sensor zone shows after a failed read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StaleReadingPolicy {
    /// Keep showing the last valid reading
    #[default]
    Retain,
    /// Blank the zone until a valid reading arrives
    Blank,
}

/// Chat relay identity for the online notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayConfig {
    /// Telegram user name
    Telegram { user: &'static str },
    /// WhatsApp number and relay API key
    WhatsApp {
        phone: &'static str,
        api_key: &'static str,
    },
}

impl RelayConfig {
    /// Wire-level relay destination
    pub const fn relay(&self) -> Relay<'static> {
        match *self {
            RelayConfig::Telegram { user } => Relay::Telegram { user },
            RelayConfig::WhatsApp { phone, api_key } => Relay::WhatsApp { phone, api_key },
        }
    }

    fn has_identity(&self) -> bool {
        match self {
            RelayConfig::Telegram { user } => !user.is_empty(),
            RelayConfig::WhatsApp { phone, api_key } => !phone.is_empty() && !api_key.is_empty(),
        }
    }
}

/// Timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// Interval between sensor polls (ms)
    pub poll_interval_ms: u32,
    /// Local time offset from UTC (s)
    pub tz_offset_s: i32,
    /// Interval between network time fetches (ms)
    pub resync_interval_ms: u32,
    /// Reconnect delay suggested to push-channel clients (ms)
    pub reconnect_hint_ms: u32,
    /// How long the "online" banner stays up before the clock (ms)
    pub banner_hold_ms: u32,
}

impl TimingConfig {
    pub const DEFAULT: Self = Self {
        poll_interval_ms: 10_000,
        tz_offset_s: 7200,
        resync_interval_ms: 3_600_000,
        reconnect_hint_ms: 10_000,
        banner_hold_ms: 10_000,
    };
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Complete device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Name used in the online notification
    pub name: &'static str,
    /// Network to join
    pub wifi_ssid: &'static str,
    /// Network passphrase; empty for open networks
    pub wifi_password: &'static str,
    /// Notification relay
    pub relay: RelayConfig,
    /// Timing
    pub timing: TimingConfig,
    /// Sensor zone behavior after a failed read
    pub stale_readings: StaleReadingPolicy,
}

impl DeviceConfig {
    pub const DEFAULT: Self = Self {
        name: "hygroclock",
        wifi_ssid: "",
        wifi_password: "",
        relay: RelayConfig::Telegram { user: "" },
        timing: TimingConfig::DEFAULT,
        stale_readings: StaleReadingPolicy::Retain,
    };

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.timing.resync_interval_ms == 0 {
            return Err(ConfigError::ZeroResyncInterval);
        }
        if self.timing.tz_offset_s.unsigned_abs() > MAX_TZ_OFFSET_S as u32 {
            return Err(ConfigError::OffsetOutOfRange);
        }
        if self.wifi_ssid.is_empty() {
            return Err(ConfigError::EmptySsid);
        }
        if !self.relay.has_identity() {
            return Err(ConfigError::MissingRelayIdentity);
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Poll interval must be non-zero
    ZeroPollInterval,
    /// Resync interval must be non-zero
    ZeroResyncInterval,
    /// Timezone offset beyond +/-14 h
    OffsetOutOfRange,
    /// No network name
    EmptySsid,
    /// Relay user, or phone and API key, missing
    MissingRelayIdentity,
}
