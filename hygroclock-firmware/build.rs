//! Build script for hygroclock-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates device.toml at compile time
//! - Generates the `DeviceConfig` constant the firmware runs with

use std::env;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Largest accepted timezone offset (s)
const MAX_TZ_OFFSET_S: i64 = 14 * 3600;

fn main() {
    setup_linker();
    let config = validate_config();
    generate_config(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate device.toml and return the parsed document
fn validate_config() -> toml::Value {
    println!("cargo:rerun-if-changed=device.toml");

    let config_path = Path::new("device.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: device.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a device.toml configuration file.         ║\n\
            ║  Please create one in the hygroclock-firmware directory.         ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read device.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in device.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_required_sections(&config, &mut errors);
    validate_wifi(&config, &mut errors);
    validate_relay(&config, &mut errors);
    validate_timing(&config, &mut errors);
    validate_display(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid device configuration                             ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=device.toml validated successfully");
    config
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn validate_required_sections(config: &toml::Value, errors: &mut Vec<String>) {
    for section in ["device", "wifi", "relay", "timing"] {
        match config.get(section) {
            Some(toml::Value::Table(_)) => {}
            Some(_) => errors.push(format!("[{}] must be a table", section)),
            None => errors.push(format!("Missing [{}] section", section)),
        }
    }
}

fn validate_wifi(config: &toml::Value, errors: &mut Vec<String>) {
    match string_at(config, "wifi", "ssid") {
        Some("") => errors.push("[wifi] ssid cannot be empty".into()),
        Some(ssid) if ssid.len() > 32 => errors.push("[wifi] ssid is longer than 32 bytes".into()),
        Some(_) => {}
        None => errors.push("[wifi] missing 'ssid'".into()),
    }
    if let Some(password) = config.get("wifi").and_then(|w| w.get("password")) {
        if !password.is_str() {
            errors.push("[wifi] password must be a string".into());
        }
    }
}

fn validate_relay(config: &toml::Value, errors: &mut Vec<String>) {
    let non_empty = |key: &str, errors: &mut Vec<String>| match string_at(config, "relay", key) {
        Some("") | None => errors.push(format!("[relay] missing '{}'", key)),
        Some(_) => {}
    };

    match string_at(config, "relay", "kind") {
        Some("telegram") => non_empty("user", errors),
        Some("whatsapp") => {
            non_empty("phone", errors);
            non_empty("api_key", errors);
        }
        Some(_) => errors.push("[relay] kind must be 'telegram' or 'whatsapp'".into()),
        None => errors.push("[relay] missing 'kind'".into()),
    }
}

fn validate_timing(config: &toml::Value, errors: &mut Vec<String>) {
    for key in [
        "poll_interval_ms",
        "resync_interval_ms",
        "reconnect_hint_ms",
        "banner_hold_ms",
    ] {
        if let Some(value) = config.get("timing").and_then(|t| t.get(key)) {
            match value.as_integer() {
                Some(v) if v < 0 || v > i64::from(u32::MAX) => {
                    errors.push(format!("[timing] {} must be 0-{}", key, u32::MAX))
                }
                Some(_) => {}
                None => errors.push(format!("[timing] {} must be an integer", key)),
            }
        }
    }

    for key in ["poll_interval_ms", "resync_interval_ms"] {
        if integer_at(config, "timing", key) == Some(0) {
            errors.push(format!("[timing] {} must be non-zero", key));
        }
    }

    if let Some(offset) = integer_at(config, "timing", "tz_offset_s") {
        if offset.abs() > MAX_TZ_OFFSET_S {
            errors.push(format!(
                "[timing] tz_offset_s must be within +/-{}",
                MAX_TZ_OFFSET_S
            ));
        }
    }
}

fn validate_display(config: &toml::Value, errors: &mut Vec<String>) {
    match string_at(config, "display", "stale_readings") {
        None | Some("retain") | Some("blank") => {}
        Some(_) => errors.push("[display] stale_readings must be 'retain' or 'blank'".into()),
    }
}

fn string_at<'a>(config: &'a toml::Value, section: &str, key: &str) -> Option<&'a str> {
    config.get(section)?.get(key)?.as_str()
}

fn integer_at(config: &toml::Value, section: &str, key: &str) -> Option<i64> {
    config.get(section)?.get(key)?.as_integer()
}

/// Write `device_config.rs` into OUT_DIR
///
/// Missing optional keys fall back to `TimingConfig::DEFAULT` and friends.
fn generate_config(config: &toml::Value) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let name = string_at(config, "device", "name").unwrap_or("hygroclock");
    let ssid = string_at(config, "wifi", "ssid").unwrap_or_default();
    let password = string_at(config, "wifi", "password").unwrap_or_default();

    let relay = match string_at(config, "relay", "kind") {
        Some("whatsapp") => format!(
            "RelayConfig::WhatsApp {{ phone: {:?}, api_key: {:?} }}",
            string_at(config, "relay", "phone").unwrap_or_default(),
            string_at(config, "relay", "api_key").unwrap_or_default(),
        ),
        _ => format!(
            "RelayConfig::Telegram {{ user: {:?} }}",
            string_at(config, "relay", "user").unwrap_or_default(),
        ),
    };

    let mut timing = String::from("TimingConfig {\n");
    for key in [
        "poll_interval_ms",
        "tz_offset_s",
        "resync_interval_ms",
        "reconnect_hint_ms",
        "banner_hold_ms",
    ] {
        if let Some(value) = integer_at(config, "timing", key) {
            writeln!(timing, "        {}: {},", key, value).unwrap();
        }
    }
    timing.push_str("        ..TimingConfig::DEFAULT\n    }");

    let stale = match string_at(config, "display", "stale_readings") {
        Some("blank") => "StaleReadingPolicy::Blank",
        _ => "StaleReadingPolicy::Retain",
    };

    let source = format!(
        "// Generated from device.toml by build.rs\n\
        pub const DEVICE: DeviceConfig = DeviceConfig {{\n    \
            name: {:?},\n    \
            wifi_ssid: {:?},\n    \
            wifi_password: {:?},\n    \
            relay: {},\n    \
            timing: {},\n    \
            stale_readings: {},\n\
        }};\n",
        name, ssid, password, relay, timing, stale
    );

    fs::write(out_dir.join("device_config.rs"), source).unwrap();
}
