//! Frame-source capability and the concrete camera backends.
//!
//! The control loop pulls frames through [`FrameSource`]; it never blocks on
//! a source.  A backend with nothing new to offer returns `Ok(None)` and the
//! cycle is skipped.

use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, sync_channel};

use hexnav_types::{Frame, NavError};

use crate::image_dir::ImageDirSource;
use crate::sim::SimCamera;

/// A pull interface over some image-capture device or feed.
pub trait FrameSource: Send {
    /// Stable identifier for this source, e.g. `"front_cam"`.
    fn id(&self) -> &str;

    /// Return the next available frame, or `Ok(None)` when none is ready.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::SourceFault`] if the feed is broken (device
    /// disconnected, undecodable image, producer gone).
    fn next_frame(&mut self) -> Result<Option<Frame>, NavError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Channel-fed source
// ────────────────────────────────────────────────────────────────────────────

/// Frames pushed by a capture thread over a bounded channel.
///
/// Each pull drains the channel and keeps only the newest frame, so a slow
/// control loop never works on stale images.
pub struct ChannelSource {
    id: String,
    rx: Receiver<Frame>,
}

impl ChannelSource {
    pub fn new(id: impl Into<String>, rx: Receiver<Frame>) -> Self {
        Self { id: id.into(), rx }
    }

    /// Create a bounded channel and the source reading from it.
    ///
    /// Producers should use `try_send` and drop frames when the channel is
    /// full.
    pub fn channel(id: impl Into<String>, bound: usize) -> (SyncSender<Frame>, Self) {
        let (tx, rx) = sync_channel(bound);
        (tx, Self::new(id, rx))
    }
}

impl FrameSource for ChannelSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, NavError> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => return Ok(latest),
                Err(TryRecvError::Disconnected) => {
                    return match latest {
                        Some(frame) => Ok(Some(frame)),
                        None => Err(NavError::SourceFault {
                            source_id: self.id.clone(),
                            details: "capture thread disconnected".to_string(),
                        }),
                    };
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Backend selection
// ────────────────────────────────────────────────────────────────────────────

/// The camera backend chosen at startup.
pub enum CameraBackend {
    Sim(SimCamera),
    ImageDir(ImageDirSource),
    Channel(ChannelSource),
}

impl CameraBackend {
    /// Short backend name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CameraBackend::Sim(_) => "sim",
            CameraBackend::ImageDir(_) => "image_dir",
            CameraBackend::Channel(_) => "channel",
        }
    }
}

impl FrameSource for CameraBackend {
    fn id(&self) -> &str {
        match self {
            CameraBackend::Sim(s) => s.id(),
            CameraBackend::ImageDir(s) => s.id(),
            CameraBackend::Channel(s) => s.id(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, NavError> {
        match self {
            CameraBackend::Sim(s) => s.next_frame(),
            CameraBackend::ImageDir(s) => s.next_frame(),
            CameraBackend::Channel(s) => s.next_frame(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_source_is_not_ready_when_empty() {
        let (_tx, mut src) = ChannelSource::channel("front_cam", 4);
        assert_eq!(src.id(), "front_cam");
        assert!(src.next_frame().unwrap().is_none());
    }

    #[test]
    fn channel_source_keeps_newest_frame() {
        let (tx, mut src) = ChannelSource::channel("front_cam", 4);
        tx.try_send(Frame::solid(2, 2, [1, 1, 1])).unwrap();
        tx.try_send(Frame::solid(2, 2, [9, 9, 9])).unwrap();
        let frame = src.next_frame().unwrap().unwrap();
        assert_eq!(frame.pixel(0, 0), [9, 9, 9]);
        assert!(src.next_frame().unwrap().is_none());
    }

    #[test]
    fn channel_source_reports_disconnect() {
        let (tx, mut src) = ChannelSource::channel("front_cam", 1);
        drop(tx);
        assert!(matches!(src.next_frame(), Err(NavError::SourceFault { .. })));
    }

    #[test]
    fn backend_delegates_to_variant() {
        let (tx, src) = ChannelSource::channel("feed", 2);
        let mut backend = CameraBackend::Channel(src);
        assert_eq!(backend.kind(), "channel");
        assert_eq!(backend.id(), "feed");
        tx.try_send(Frame::solid(1, 1, [5, 5, 5])).unwrap();
        assert!(backend.next_frame().unwrap().is_some());
    }
}
