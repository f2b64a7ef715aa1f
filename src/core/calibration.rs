// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Camera calibration model: intrinsics and lens distortion.
//!
//! The model is loaded once at startup and shared read-only with the
//! undistorter. Every fatal startup misconfiguration of the pipeline is
//! reported through [`CalibrationError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::misc::type_aliases::Float;

/// Intrinsics parameters of the camera.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Intrinsics {
    /// Principal point (cx, cy) of the camera, in pixels.
    pub principal_point: (Float, Float),
    /// Focal length in pixels for each axis (fx, fy).
    pub focal: (Float, Float),
    /// Skew coefficient, usually 0.
    pub skew: Float,
}

/// Brown-Conrady lens distortion coefficients.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Distortion {
    /// First radial coefficient.
    pub k1: Float,
    /// Second radial coefficient.
    pub k2: Float,
    /// First tangential coefficient.
    pub p1: Float,
    /// Second tangential coefficient.
    pub p2: Float,
    /// Third radial coefficient.
    pub k3: Float,
}

/// Full calibration model of the camera, immutable after startup.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Calibration {
    /// Intrinsic matrix parameters.
    pub intrinsics: Intrinsics,
    /// Lens distortion coefficients.
    pub distortion: Distortion,
}

/// Fatal startup misconfiguration.
///
/// Anything in this enum means the pipeline cannot produce meaningful
/// output and must not start.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// The intrinsic matrix cannot be inverted.
    #[error("calibration matrix is singular")]
    SingularMatrix,
    /// A frame does not match the session resolution.
    #[error("frame is {found_width}x{found_height} but the session is configured for {width}x{height}")]
    DimensionMismatch {
        /// Configured session width.
        width: usize,
        /// Configured session height.
        height: usize,
        /// Width of the offending frame.
        found_width: usize,
        /// Height of the offending frame.
        found_height: usize,
    },
    /// FIR taps must be non-empty, finite and sum to one.
    #[error("FIR taps must be non-empty, finite and sum to one (sum was {0})")]
    InvalidTaps(Float),
    /// Filter variances must be positive and finite.
    #[error("filter variances must be positive and finite")]
    InvalidVariance,
    /// The target cycle rate must be positive and finite.
    #[error("target rate must be positive and finite")]
    InvalidRate,
    /// The flow estimator needs at least one pyramid level.
    #[error("flow estimator needs at least one pyramid level")]
    InvalidLevels,
}
