// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-axis velocity smoothing.
//!
//! Each axis runs the raw velocity through an FIR low-pass stage, then
//! through a second smoothing stage: either a cascaded identical FIR
//! stage or a scalar recursive estimator with constant variances. A
//! motion-threshold deadzone ahead of the chains suppresses sensor noise
//! drift while the vehicle stands still.

use std::collections::VecDeque;

use itertools::izip;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::calibration::CalibrationError;
use crate::misc::type_aliases::{Float, Vec2};

/// Fatal numeric corruption of a filter state.
///
/// Once a chain holds a non-finite value or a negative variance, every
/// downstream estimate would be silently wrong, so the pipeline stops.
#[derive(Debug, Error)]
#[error("filter state diverged: {0}")]
pub struct FilterDivergence(pub String);

/// FIR low-pass stage: fixed symmetric taps over a FIFO window of the
/// most recent raw samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Fir {
    taps: Vec<Float>,
    window: VecDeque<Float>,
}

impl Fir {
    /// Build from tap coefficients, which must be non-empty, finite and
    /// sum to one so that a constant input converges to itself.
    ///
    /// The window starts zero-filled: the capacity invariant holds from
    /// the first sample on.
    pub fn new(taps: &[Float]) -> Result<Fir, CalibrationError> {
        let sum: Float = taps.iter().sum();
        if taps.is_empty() || !sum.is_finite() || (sum - 1.0).abs() > 1e-3 {
            return Err(CalibrationError::InvalidTaps(sum));
        }
        Ok(Fir {
            taps: taps.to_vec(),
            window: vec![0.0; taps.len()].into(),
        })
    }

    /// Insert a raw sample, evicting the oldest, and return the weighted
    /// sum of the window against the taps.
    pub fn push(&mut self, sample: Float) -> Float {
        self.window.pop_front();
        self.window.push_back(sample);
        izip!(&self.taps, &self.window).map(|(tap, s)| tap * s).sum()
    }
}

/// Scalar recursive Bayesian estimator with constant process and
/// measurement variances: the simplest correct recursive estimator for a
/// scalar quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Recursive {
    estimate: Float,
    error: Float,
    process_variance: Float,
    measurement_variance: Float,
}

impl Recursive {
    /// New estimator at zero with unit initial estimate-error.
    pub fn new(process_variance: Float, measurement_variance: Float) -> Result<Recursive, CalibrationError> {
        let valid = |v: Float| v.is_finite() && v > 0.0;
        if !valid(process_variance) || !valid(measurement_variance) {
            return Err(CalibrationError::InvalidVariance);
        }
        Ok(Recursive {
            estimate: 0.0,
            error: 1.0,
            process_variance,
            measurement_variance,
        })
    }

    /// One measurement update.
    pub fn update(&mut self, measurement: Float) -> Result<Float, FilterDivergence> {
        let prediction = self.estimate;
        let prediction_error = self.error + self.process_variance;
        let gain = prediction_error / (prediction_error + self.measurement_variance);
        self.estimate = prediction + gain * (measurement - prediction);
        self.error = (1.0 - gain) * prediction_error;
        if !self.estimate.is_finite() || !self.error.is_finite() || self.error < 0.0 {
            return Err(FilterDivergence(format!(
                "estimate {}, estimate-error {}",
                self.estimate, self.error
            )));
        }
        Ok(self.estimate)
    }

    /// Current estimate-error.
    pub fn error(&self) -> Float {
        self.error
    }
}

/// Second-stage choice, fixed at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmoothingConfig {
    /// Cascade a second FIR stage with the same taps.
    Cascaded,
    /// Scalar recursive estimator with fixed variances.
    Recursive {
        /// Process variance of the recursive estimator.
        process_variance: Float,
        /// Measurement variance of the recursive estimator.
        measurement_variance: Float,
    },
}

/// Startup parameters shared by both per-axis chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// FIR tap coefficients; must sum to one.
    pub taps: Vec<Float>,
    /// Second smoothing stage.
    pub smoothing: SmoothingConfig,
    /// Displacements with both axis magnitudes under this threshold
    /// (in pixels) are zeroed ahead of the chains.
    pub motion_threshold: Float,
}

#[derive(Debug, Clone, PartialEq)]
enum Second {
    Fir(Fir),
    Recursive(Recursive),
}

/// One axis of the filter chain: FIR stage, then second smoothing stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    fir: Fir,
    second: Second,
}

impl Chain {
    /// Build one axis chain from the shared configuration.
    pub fn new(config: &Config) -> Result<Chain, CalibrationError> {
        let fir = Fir::new(&config.taps)?;
        let second = match config.smoothing {
            SmoothingConfig::Cascaded => Second::Fir(Fir::new(&config.taps)?),
            SmoothingConfig::Recursive {
                process_variance,
                measurement_variance,
            } => Second::Recursive(Recursive::new(process_variance, measurement_variance)?),
        };
        Ok(Chain { fir, second })
    }

    /// Run one raw velocity sample through both stages.
    pub fn push(&mut self, raw: Float) -> Result<Float, FilterDivergence> {
        let smoothed = self.fir.push(raw);
        match &mut self.second {
            Second::Recursive(recursive) => recursive.update(smoothed),
            Second::Fir(fir) => {
                let out = fir.push(smoothed);
                if out.is_finite() {
                    Ok(out)
                } else {
                    Err(FilterDivergence(format!("FIR output {}", out)))
                }
            }
        }
    }
}

/// Zero the displacement when both axis magnitudes fall under the motion
/// threshold.
pub fn deadzone(shift: Vec2, threshold: Float) -> Vec2 {
    if shift.x.abs() < threshold && shift.y.abs() < threshold {
        Vec2::zeros()
    } else {
        shift
    }
}
