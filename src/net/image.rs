//! Assembly of acquired frames into one raster image.

use tracing::debug;

use crate::error::{Result, SaneError};
use crate::net::types::{FrameKind, FrameParameters};

/// One channel of image data with its final parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub parameters: FrameParameters,
    pub bytes: Vec<u8>,
}

/// Assembled multi-band raster.
///
/// Either a single GRAY/RGB frame or the three bands RED, GREEN, BLUE in
/// that order. Rendering into a host image type is the caller's job; the
/// assembler only guarantees the frames are mutually consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct SaneImage {
    width: i32,
    height: i32,
    bytes_per_line: i32,
    depth: i32,
    frames: Vec<Frame>,
}

impl SaneImage {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn bytes_per_line(&self) -> i32 {
        self.bytes_per_line
    }

    /// Bits per sample: 1, 8, or 16.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

/// Collects frames one at a time and freezes them into a [`SaneImage`].
#[derive(Debug, Default)]
pub struct ImageAssembler {
    frames: Vec<Frame>,
}

impl ImageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one acquired frame.
    ///
    /// Frames must not repeat a kind, must all carry the same payload
    /// length, and a singleton frame (GRAY or RGB) must be the only frame.
    pub fn add_frame(&mut self, frame: Frame) -> Result<()> {
        let kind = frame.parameters.frame;

        if self.frames.iter().any(|f| f.parameters.frame == kind) {
            return Err(SaneError::protocol(format!("duplicate {kind} frame in one image")));
        }
        if let Some(first) = self.frames.first() {
            if first.parameters.frame.is_singleton() {
                return Err(SaneError::protocol(format!(
                    "{kind} frame after complete {} frame",
                    first.parameters.frame
                )));
            }
            if kind.is_singleton() {
                return Err(SaneError::protocol(format!(
                    "complete {kind} frame after partial {} frame",
                    first.parameters.frame
                )));
            }
            if first.bytes.len() != frame.bytes.len() {
                return Err(SaneError::protocol(format!(
                    "frame length mismatch: {kind} carries {} bytes, expected {}",
                    frame.bytes.len(),
                    first.bytes.len()
                )));
            }
        }

        debug!(frame = %kind, bytes = frame.bytes.len(), "frame added");
        self.frames.push(frame);
        Ok(())
    }

    /// Freeze the collected frames.
    ///
    /// Valid compositions are one singleton frame, or exactly the three
    /// bands RED, GREEN and BLUE (any arrival order; stored as R, G, B).
    pub fn build(mut self) -> Result<SaneImage> {
        match self.frames.len() {
            1 if self.frames[0].parameters.frame.is_singleton() => {}
            3 => {
                // add_frame already rejected duplicates and singletons, so
                // three frames are exactly one each of RED, GREEN, BLUE.
                self.frames.sort_by_key(|f| f.parameters.frame);
            }
            _ => {
                let kinds: Vec<String> = self.frames.iter().map(|f| f.parameters.frame.to_string()).collect();
                return Err(SaneError::protocol(format!(
                    "image cannot be assembled from frames [{}]",
                    kinds.join(", ")
                )));
            }
        }

        let first = &self.frames[0].parameters;
        Ok(SaneImage {
            width: first.pixels_per_line,
            height: first.lines,
            bytes_per_line: first.bytes_per_line,
            depth: first.depth,
            frames: self.frames,
        })
    }
}
