//! `hexnav-types` – shared vocabulary of the hexapod navigation stack.
//!
//! Every other crate speaks in these types: the camera [`Frame`], the spatial
//! [`Zone`]s of the detection band, the ordered [`DangerLevel`], the discrete
//! movement [`Action`]s, the validated [`NavConfig`] and the single domain
//! error [`NavError`].

pub mod config;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use config::NavConfig;

// ────────────────────────────────────────────────────────────────────────────
// Frame
// ────────────────────────────────────────────────────────────────────────────

/// Bytes per pixel of the packed RGB24 layout used by [`Frame`].
pub const CHANNELS: usize = 3;

/// A single camera image in packed RGB24, row-major order.
///
/// A frame is immutable once produced: the builder helpers consume `self`
/// and return a new value.  Construction does **not** validate the buffer;
/// call [`Frame::validate`] before handing the frame to detection so that
/// malformed input can be rejected (and tested) explicitly.
#[derive(Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap a raw RGB24 buffer captured now.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::with_timestamp(width, height, data, Utc::now())
    }

    /// Wrap a raw RGB24 buffer with an explicit capture timestamp.
    pub fn with_timestamp(width: u32, height: u32, data: Vec<u8>, captured_at: DateTime<Utc>) -> Self {
        Self {
            width,
            height,
            data,
            captured_at,
        }
    }

    /// A frame filled with one uniform colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self::new(width, height, data)
    }

    /// Paint an axis-aligned filled rectangle, clipped to the frame.
    ///
    /// `x`/`y` are the top-left corner; the rectangle covers rows
    /// `y..y + h` and columns `x..x + w`.
    pub fn with_rect(mut self, x: u32, y: u32, w: u32, h: u32, rgb: [u8; 3]) -> Self {
        if self.validate().is_err() {
            return self;
        }
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for row in y.min(self.height)..y_end {
            for col in x.min(self.width)..x_end {
                let idx = (row as usize * self.width as usize + col as usize) * CHANNELS;
                self.data[idx..idx + CHANNELS].copy_from_slice(&rgb);
            }
        }
        self
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB24 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Wall-clock time at which the frame was captured.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Return the RGB triple at `(x, y)`.
    ///
    /// The caller must have validated the frame and stay within bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Check basic shape invariants: positive dimensions and a buffer of
    /// exactly `width * height * 3` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::MalformedFrame`] describing the first violation.
    pub fn validate(&self) -> Result<(), NavError> {
        if self.width == 0 || self.height == 0 {
            return Err(NavError::MalformedFrame(format!(
                "non-positive dimensions {}x{}",
                self.width, self.height
            )));
        }
        let expected = self.width as usize * self.height as usize * CHANNELS;
        if self.data.len() != expected {
            return Err(NavError::MalformedFrame(format!(
                "buffer holds {} bytes, expected {} for {}x{} RGB24",
                self.data.len(),
                expected,
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Spatial vocabulary
// ────────────────────────────────────────────────────────────────────────────

/// One of the three horizontal partitions of the detection band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Left,
    Center,
    Right,
}

impl Zone {
    /// All zones, left to right.
    pub const ALL: [Zone; 3] = [Zone::Left, Zone::Center, Zone::Right];

    /// Index of the zone in [`Zone::ALL`].
    pub fn index(self) -> usize {
        match self {
            Zone::Left => 0,
            Zone::Center => 1,
            Zone::Right => 2,
        }
    }

    /// The lateral side this zone sits on, `None` for the center.
    pub fn side(self) -> Option<Side> {
        match self {
            Zone::Left => Some(Side::Left),
            Zone::Center => None,
            Zone::Right => Some(Side::Right),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Left => write!(f, "LEFT"),
            Zone::Center => write!(f, "CENTER"),
            Zone::Right => write!(f, "RIGHT"),
        }
    }
}

/// A lateral direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// The other side.
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// The zone on this side of the band.
    pub fn zone(self) -> Zone {
        match self {
            Side::Left => Zone::Left,
            Side::Right => Zone::Right,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Hazard and movement vocabulary
// ────────────────────────────────────────────────────────────────────────────

/// Global hazard severity of one cycle, strictly ordered
/// `Ok < Obs < Warn < Stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DangerLevel {
    #[default]
    Ok,
    Obs,
    Warn,
    Stop,
}

impl fmt::Display for DangerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DangerLevel::Ok => write!(f, "OK"),
            DangerLevel::Obs => write!(f, "OBS"),
            DangerLevel::Warn => write!(f, "WARN"),
            DangerLevel::Stop => write!(f, "STOP"),
        }
    }
}

/// Discrete movement command handed to the action sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Advance,
    TranslateLeft,
    TranslateRight,
    Circumvent,
    Rotate,
    Stop,
    Paused,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Advance => "ADVANCE",
            Action::TranslateLeft => "TRANSLATE_LEFT",
            Action::TranslateRight => "TRANSLATE_RIGHT",
            Action::Circumvent => "CIRCUMVENT",
            Action::Rotate => "ROTATE",
            Action::Stop => "STOP",
            Action::Paused => "PAUSED",
        };
        f.write_str(label)
    }
}

/// An [`Action`] plus the turning side when the action is a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionCommand {
    pub action: Action,
    /// Set only for [`Action::Rotate`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<Side>,
}

impl MotionCommand {
    /// A command without a turning side.
    pub fn new(action: Action) -> Self {
        Self { action, turn: None }
    }

    /// A rotation towards `side`.
    pub fn rotate(side: Side) -> Self {
        Self {
            action: Action::Rotate,
            turn: Some(side),
        }
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.turn {
            Some(side) => write!(f, "{}({side})", self.action),
            None => write!(f, "{}", self.action),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Domain error spanning configuration, frame validation and the external
/// source/sink boundaries.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NavError {
    #[error("Configuration Error on {field}: {reason}")]
    Config { field: String, reason: String },

    #[error("Malformed Frame: {0}")]
    MalformedFrame(String),

    #[error("Frame Source Fault on {source_id}: {details}")]
    SourceFault { source_id: String, details: String },

    #[error("Actuator Fault on {component}: {details}")]
    ActuatorFault { component: String, details: String },

    #[error("Diagnostic Output Error: {0}")]
    Diagnostic(String),
}

impl NavError {
    /// Shorthand for a [`NavError::Config`] on `field`.
    pub fn config(field: &str, reason: impl Into<String>) -> Self {
        NavError::Config {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
