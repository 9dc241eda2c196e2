//! Still-image directory replayed as a camera feed.

use std::fs;
use std::path::{Path, PathBuf};

use hexnav_types::{Frame, NavError};
use tracing::{debug, info};

use crate::camera::FrameSource;

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Decodes the images of a directory in file-name order, one per pull.
///
/// Once every image was served the source either starts over (`looping`)
/// or reports "not ready" forever.
pub struct ImageDirSource {
    id: String,
    files: Vec<PathBuf>,
    cursor: usize,
    looping: bool,
}

impl ImageDirSource {
    /// Scan `dir` for supported image files.
    ///
    /// # Errors
    ///
    /// [`NavError::SourceFault`] when the directory cannot be read or holds
    /// no supported image.
    pub fn open(id: impl Into<String>, dir: &Path, looping: bool) -> Result<Self, NavError> {
        let id = id.into();
        let fault = |details: String| NavError::SourceFault {
            source_id: id.clone(),
            details,
        };

        let entries = fs::read_dir(dir).map_err(|e| fault(format!("cannot read {}: {e}", dir.display())))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_image_extension(p))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(fault(format!("no images found in {}", dir.display())));
        }
        info!(source = %id, images = files.len(), dir = %dir.display(), "image directory source opened");
        Ok(Self {
            id,
            files,
            cursor: 0,
            looping,
        })
    }

    /// Number of images in the directory.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageDirSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, NavError> {
        if self.cursor >= self.files.len() {
            if !self.looping {
                return Ok(None);
            }
            self.cursor = 0;
        }
        let path = &self.files[self.cursor];
        self.cursor += 1;

        let img = image::open(path)
            .map_err(|e| NavError::SourceFault {
                source_id: self.id.clone(),
                details: format!("cannot decode {}: {e}", path.display()),
            })?
            .to_rgb8();
        debug!(path = %path.display(), w = img.width(), h = img.height(), "frame decoded");
        let (w, h) = img.dimensions();
        Ok(Some(Frame::new(w, h, img.into_raw())))
    }
}
