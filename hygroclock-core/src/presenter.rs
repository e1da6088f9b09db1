//! Clock face presenter
//!
//! Zone one carries the day name and a large, horizontally centered
//! `HH:MM:SS`. Zone two carries the last valid reading as two small lines.
//! Every frame is one clear, draw, flush sequence.

use core::fmt::Write;

use heapless::String;
use hygroclock_display::{DisplayBackend, DisplayError, TextSize};

use crate::clock::ClockSnapshot;
use crate::config::StaleReadingPolicy;
use crate::readings::{one_decimal, Reading};
use crate::state::DeviceAddress;

/// Top of the temperature line
const TEMP_Y: i32 = 44;
/// Top of the humidity line
const HUM_Y: i32 = 54;
/// Line pitch for banners
const BANNER_PITCH: i32 = 12;

/// Full-screen messages shown while the network comes up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Banner<'a> {
    /// Association in progress
    Connecting { ssid: &'a str },
    /// Address acquired; the server is listening
    Online { address: DeviceAddress },
}

/// Display presenter
pub struct DisplayPresenter<D> {
    display: D,
    policy: StaleReadingPolicy,
    /// Last valid reading, subject to `policy`
    last_valid: Option<Reading>,
}

impl<D: DisplayBackend> DisplayPresenter<D> {
    pub fn new(display: D, policy: StaleReadingPolicy) -> Self {
        Self {
            display,
            policy,
            last_valid: None,
        }
    }

    /// Record a fresh poll result for the sensor zone
    pub fn observe(&mut self, reading: &Reading) {
        if reading.is_valid() {
            self.last_valid = Some(*reading);
        } else if self.policy == StaleReadingPolicy::Blank {
            self.last_valid = None;
        }
    }

    /// Reading zone two currently shows
    pub fn shown_reading(&self) -> Option<&Reading> {
        self.last_valid.as_ref()
    }

    /// Render the clock face
    ///
    /// `reading` is this tick's poll result, if a poll happened.
    pub fn render(
        &mut self,
        clock: &ClockSnapshot,
        reading: Option<&Reading>,
    ) -> Result<(), DisplayError> {
        if let Some(reading) = reading {
            self.observe(reading);
        }

        self.display.clear()?;

        self.display
            .draw_text(0, 0, TextSize::Small, clock.day_of_week.name())?;

        let (width, height) = self.display.dimensions();
        let (glyph_w, _) = self.display.glyph_size(TextSize::Large);
        let x = centered_x(width, glyph_w, clock.formatted.len());
        self.display.draw_text(
            x,
            i32::from(height / 4),
            TextSize::Large,
            &clock.formatted,
        )?;

        if let Some(reading) = self.last_valid {
            if let Some(line) = sensor_line("Temp: ", reading.temperature, " C") {
                self.display.draw_text(0, TEMP_Y, TextSize::Small, &line)?;
            }
            if let Some(line) = sensor_line("Hum: ", reading.humidity, " %") {
                self.display.draw_text(0, HUM_Y, TextSize::Small, &line)?;
            }
        }

        self.display.flush()
    }

    /// Render a full-screen banner
    pub fn render_banner(&mut self, banner: Banner<'_>) -> Result<(), DisplayError> {
        self.display.clear()?;
        match banner {
            Banner::Connecting { ssid } => {
                self.display
                    .draw_text(0, 0, TextSize::Small, "Connecting to")?;
                self.display.draw_text(0, BANNER_PITCH, TextSize::Small, ssid)?;
            }
            Banner::Online { address } => {
                let mut addr: String<15> = String::new();
                // Dotted quad is at most 15 characters
                let _ = write!(addr, "{}", address);
                self.display
                    .draw_text(0, 0, TextSize::Small, "Server started")?;
                self.display
                    .draw_text(0, BANNER_PITCH, TextSize::Small, "IP address")?;
                self.display
                    .draw_text(0, 2 * BANNER_PITCH, TextSize::Small, &addr)?;
            }
        }
        self.display.flush()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }
}

/// Left edge that centers `len` glyphs, clamped to the screen
pub fn centered_x(width: u16, glyph_w: u16, len: usize) -> i32 {
    let x = i32::from(width) / 2 - (i32::from(glyph_w) * len as i32) / 2;
    x.max(0)
}

fn sensor_line(label: &str, value: f32, unit: &str) -> Option<String<24>> {
    let value = one_decimal(value)?;
    let mut line = String::new();
    line.push_str(label).ok()?;
    line.push_str(&value).ok()?;
    line.push_str(unit).ok()?;
    Some(line)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::ClockSync;

    /// Everything a frame consisted of
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Frame {
        pub texts: Vec<(i32, i32, TextSize, std::string::String)>,
    }

    impl Frame {
        pub fn contains(&self, text: &str) -> bool {
            self.texts.iter().any(|(_, _, _, t)| t == text)
        }
    }

    /// Records flushed frames; can be told to fail
    #[derive(Debug, Default)]
    pub struct RecordingDisplay {
        pub current: Frame,
        pub frames: Vec<Frame>,
        pub clears: usize,
        pub fail: bool,
    }

    impl DisplayBackend for RecordingDisplay {
        fn clear(&mut self) -> Result<(), DisplayError> {
            if self.fail {
                return Err(DisplayError::Communication);
            }
            self.clears += 1;
            self.current = Frame::default();
            Ok(())
        }

        fn draw_text(
            &mut self,
            x: i32,
            y: i32,
            size: TextSize,
            text: &str,
        ) -> Result<(), DisplayError> {
            self.current.texts.push((x, y, size, text.into()));
            Ok(())
        }

        fn flush(&mut self) -> Result<(), DisplayError> {
            if self.fail {
                return Err(DisplayError::Communication);
            }
            self.frames.push(self.current.clone());
            Ok(())
        }

        fn dimensions(&self) -> (u16, u16) {
            (128, 64)
        }

        fn glyph_size(&self, size: TextSize) -> (u16, u16) {
            match size {
                TextSize::Small => (6, 10),
                TextSize::Large => (10, 20),
            }
        }

        fn is_ready(&self) -> bool {
            !self.fail
        }
    }

    fn presenter(policy: StaleReadingPolicy) -> DisplayPresenter<RecordingDisplay> {
        DisplayPresenter::new(RecordingDisplay::default(), policy)
    }

    fn snapshot() -> ClockSnapshot {
        // Thursday 02:00:00 local
        ClockSync::new(7200).tick(0)
    }

    #[test]
    fn test_scenario_frame() {
        let mut p = presenter(StaleReadingPolicy::Retain);
        p.render(&snapshot(), Some(&Reading::new(55.2, 21.7))).unwrap();

        let frame = p.display().frames.last().unwrap();
        assert!(frame.contains("Thursday"));
        assert!(frame.contains("Temp: 21.7 C"));
        assert!(frame.contains("Hum: 55.2 %"));

        // 128/2 - (10*8)/2 = 24
        let time = frame
            .texts
            .iter()
            .find(|(_, _, _, t)| t == "02:00:00")
            .unwrap();
        assert_eq!((time.0, time.1, time.2), (24, 16, TextSize::Large));
    }

    #[test]
    fn test_zone_two_blank_before_first_reading() {
        let mut p = presenter(StaleReadingPolicy::Retain);
        p.render(&snapshot(), None).unwrap();
        let frame = p.display().frames.last().unwrap();
        assert_eq!(frame.texts.len(), 2);
    }

    #[test]
    fn test_retain_keeps_last_valid() {
        let mut p = presenter(StaleReadingPolicy::Retain);
        p.render(&snapshot(), Some(&Reading::new(55.2, 21.7))).unwrap();
        p.render(&snapshot(), Some(&Reading::invalid())).unwrap();

        let frame = p.display().frames.last().unwrap();
        assert!(frame.contains("Temp: 21.7 C"));
        assert!(frame.contains("Hum: 55.2 %"));
    }

    #[test]
    fn test_blank_clears_zone_two() {
        let mut p = presenter(StaleReadingPolicy::Blank);
        p.render(&snapshot(), Some(&Reading::new(55.2, 21.7))).unwrap();
        p.render(&snapshot(), Some(&Reading::invalid())).unwrap();

        let frame = p.display().frames.last().unwrap();
        assert!(!frame.texts.iter().any(|(_, _, _, t)| t.starts_with("Temp")));
        assert!(p.shown_reading().is_none());

        // Comes back with the next valid reading
        p.render(&snapshot(), Some(&Reading::new(50.0, 20.0))).unwrap();
        assert!(p.display().frames.last().unwrap().contains("Temp: 20.0 C"));
    }

    #[test]
    fn test_one_clear_per_render() {
        let mut p = presenter(StaleReadingPolicy::Retain);
        p.render(&snapshot(), None).unwrap();
        p.render(&snapshot(), None).unwrap();
        assert_eq!(p.display().clears, 2);
        assert_eq!(p.display().frames.len(), 2);
    }

    #[test]
    fn test_banners() {
        let mut p = presenter(StaleReadingPolicy::Retain);
        p.render_banner(Banner::Connecting { ssid: "home" }).unwrap();
        let frame = p.display().frames.last().unwrap();
        assert!(frame.contains("Connecting to"));
        assert!(frame.contains("home"));

        p.render_banner(Banner::Online {
            address: DeviceAddress([192, 168, 1, 40]),
        })
        .unwrap();
        let frame = p.display().frames.last().unwrap();
        assert!(frame.contains("Server started"));
        assert!(frame.contains("192.168.1.40"));
    }

    #[test]
    fn test_display_failure_propagates() {
        let mut p = presenter(StaleReadingPolicy::Retain);
        p.display_mut().fail = true;
        assert_eq!(
            p.render(&snapshot(), None),
            Err(DisplayError::Communication)
        );
    }

    #[test]
    fn test_centering_clamps() {
        assert_eq!(centered_x(128, 10, 8), 24);
        assert_eq!(centered_x(128, 6, 40), 0);
    }
}
