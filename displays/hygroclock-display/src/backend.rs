//! Display backend trait
//!
//! Defines the interface the clock face is drawn through.

/// Display backend errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Communication error with display
    Communication,
    /// Display not initialized
    NotInitialized,
}

/// Text sizes used on the clock face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextSize {
    /// Labels and sensor lines
    Small,
    /// The time of day
    Large,
}

/// Display backend trait
///
/// Provides a hardware-agnostic interface for rendering a frame.
/// Implementations buffer drawing until `flush`.
pub trait DisplayBackend {
    /// Clear the frame buffer
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Draw text with its top-left corner at (`x`, `y`) pixels
    ///
    /// Text running past the right or bottom edge is clipped.
    fn draw_text(&mut self, x: i32, y: i32, size: TextSize, text: &str)
        -> Result<(), DisplayError>;

    /// Send the buffered frame to the hardware
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Get the display dimensions
    ///
    /// Returns (width, height) in pixels
    fn dimensions(&self) -> (u16, u16);

    /// Width and height of one character cell at `size`, in pixels
    fn glyph_size(&self, size: TextSize) -> (u16, u16);

    /// Check if the display is ready
    fn is_ready(&self) -> bool;
}
