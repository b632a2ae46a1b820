//! Adalight frame encoding.
//!
//! A frame is the byte sequence written to the serial device on every
//! update-loop tick: a 6-byte header followed by one RGB triple per LED.

use std::fmt;

/// Size of the Adalight frame header in bytes.
pub const HEADER_SIZE: usize = 6;

/// Magic identifier at the start of every frame.
pub const MAGIC: [u8; 3] = *b"Ada";

/// An RGB color with 0–255 intensity per channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.r, self.g, self.b)
    }
}

/// Errors from frame encoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("expected {expected} colors, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// One complete Adalight frame plus the mirror array of current colors.
///
/// The buffer length is fixed at construction (`6 + 3×N`) and the header
/// bytes are never touched again; [`fill`](FrameBuffer::fill) and
/// [`set_colors`](FrameBuffer::set_colors) only rewrite the triples from
/// offset 6 onward.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    led_count: usize,
    bytes: Vec<u8>,
    colors: Vec<Color>,
}

impl FrameBuffer {
    /// Build a frame for `led_count` LEDs, all black.
    ///
    /// Callers validate the count (1–255) before construction; see
    /// [`LedDriver::new`](crate::driver::LedDriver::new).
    pub fn new(led_count: usize) -> Self {
        let mut bytes = vec![0u8; HEADER_SIZE + led_count * 3];
        bytes[0..3].copy_from_slice(&MAGIC);
        bytes[3] = 0;
        bytes[4] = 0;
        // Canonical Adalight framing would put count-1 here followed by a
        // checksum byte (hi ^ lo ^ 0x55); the strips this daemon targets
        // expect the raw count and no checksum.
        bytes[5] = led_count.min(255) as u8;

        Self {
            led_count,
            bytes,
            colors: vec![Color::BLACK; led_count],
        }
    }

    /// Number of LEDs this frame addresses.
    pub fn led_count(&self) -> usize {
        self.led_count
    }

    /// The complete wire frame (header + triples).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The colors currently encoded into the frame, in strip order.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Set every LED to the same color.
    pub fn fill(&mut self, color: Color) {
        let mut offset = HEADER_SIZE;
        for slot in self.colors.iter_mut() {
            *slot = color;
            self.bytes[offset] = color.r;
            self.bytes[offset + 1] = color.g;
            self.bytes[offset + 2] = color.b;
            offset += 3;
        }
    }

    /// Replace all LED colors at once, in strip order.
    ///
    /// Rejects a slice whose length differs from the LED count without
    /// mutating the frame or the mirror array.
    pub fn set_colors(&mut self, colors: &[Color]) -> Result<(), FrameError> {
        if colors.len() != self.led_count {
            return Err(FrameError::CountMismatch {
                expected: self.led_count,
                actual: colors.len(),
            });
        }

        let mut offset = HEADER_SIZE;
        for (slot, color) in self.colors.iter_mut().zip(colors) {
            *slot = *color;
            self.bytes[offset] = color.r;
            self.bytes[offset + 1] = color.g;
            self.bytes[offset + 2] = color.b;
            offset += 3;
        }
        Ok(())
    }
}
