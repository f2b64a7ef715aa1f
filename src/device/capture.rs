// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frame acquisition boundary.

use image::RgbImage;
use thiserror::Error;

/// A fixed-resolution color frame and its capture timestamp in seconds.
pub struct CameraFrame {
    /// Raw color pixels.
    pub pixels: RgbImage,
    /// Capture timestamp, in seconds.
    pub timestamp: f64,
}

/// Frame acquisition failures.
///
/// Only `Exhausted` ends the run; everything else is transient and costs
/// one skipped cycle.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A finite source has no more frames.
    #[error("frame source exhausted")]
    Exhausted,
    /// A frame could not be read or decoded.
    #[error("could not decode frame: {0}")]
    Decode(#[from] image::ImageError),
    /// Transient device-level failure.
    #[error("capture failed: {0}")]
    Device(String),
}

/// Anything able to produce one frame per cycle.
///
/// `capture` is a blocking call, the dominant latency source of the
/// whole loop. The estimation loop owns the source exclusively;
/// dropping it must release the underlying device handle.
pub trait FrameSource {
    /// Block until the next frame is available.
    fn capture(&mut self) -> Result<CameraFrame, CaptureError>;
}
