// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversion of pixel displacements into metric velocities.

use serde::{Deserialize, Serialize};

use crate::misc::type_aliases::{Float, Vec2};

/// Startup constants of the converter.
///
/// The scalars and reference focal constant absorb lens and mount
/// asymmetry; they are calibration data, deliberately without defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Height of the camera above the tracked surface, in meters.
    pub altitude: Float,
    /// Per-axis calibration scalars (x, y) applied to the pixel shift.
    pub scalars: (Float, Float),
    /// Reference focal constant of the arctangent mapping, in pixels.
    pub reference_focal: Float,
}

/// Deterministic, stateless pixel-to-metric conversion.
pub struct Converter {
    rate: Float,
    config: Config,
}

impl Converter {
    /// New converter for the given target cycle rate (Hz).
    pub fn new(rate: Float, config: Config) -> Self {
        Converter { rate, config }
    }

    /// `velocity = rate * altitude * atan2(scalar * shift, reference_focal)`
    /// per axis.
    ///
    /// The arctangent bounds the velocity for large pixel shifts instead
    /// of scaling linearly without limit.
    pub fn velocity(&self, shift: Vec2) -> Vec2 {
        let axis = |scalar: Float, pixels: Float| {
            self.rate * self.config.altitude * (scalar * pixels).atan2(self.config.reference_focal)
        };
        Vec2::new(
            axis(self.config.scalars.0, shift.x),
            axis(self.config.scalars.1, shift.y),
        )
    }
}
