// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The synchronous estimation loop.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::core::pipeline::{Pipeline, PipelineError};
use crate::device::capture::{CaptureError, FrameSource};
use crate::device::schedule::RateScheduler;
use crate::device::telemetry::TelemetrySink;
use crate::misc::interop;

/// Run the estimation loop until the source is exhausted, `cancel` is
/// raised, or a fatal error occurs.
///
/// The frame source is taken by value: whatever the exit path (normal
/// completion, cancellation, a capture failure or a fatal pipeline
/// error), it is dropped here and its device handle released. Transient
/// capture failures cost one skipped cycle and leave every estimate
/// untouched. The cancellation flag is checked once per cycle boundary.
pub fn run<S, T>(
    pipeline: &mut Pipeline,
    mut source: S,
    sink: &mut T,
    scheduler: &mut RateScheduler,
    cancel: &AtomicBool,
) -> Result<(), PipelineError>
where
    S: FrameSource,
    T: TelemetrySink,
{
    loop {
        if cancel.load(Ordering::Relaxed) {
            info!("cancellation requested, stopping the estimation loop");
            return Ok(());
        }
        scheduler.wait();
        let frame = match source.capture() {
            Ok(frame) => frame,
            Err(CaptureError::Exhausted) => {
                info!("frame source exhausted, stopping the estimation loop");
                return Ok(());
            }
            Err(error) => {
                warn!("skipping cycle: {}", error);
                continue;
            }
        };
        let gray = interop::gray_matrix_from_rgb(&frame.pixels);
        if let Some(update) = pipeline.process(&gray, frame.timestamp)? {
            if let Err(error) = sink.emit(&update) {
                warn!("telemetry emit failed: {}", error);
            }
        }
    }
}
