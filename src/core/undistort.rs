// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Geometric correction of raw frames: lens undistortion and the
//! mounting-orientation rotation.

use nalgebra::DMatrix;

use crate::core::calibration::{Calibration, CalibrationError};
use crate::misc::helper::sample_bilinear;
use crate::misc::type_aliases::{FieldMatrix, GrayMatrix};

/// Precomputed undistortion remapper for one session frame size.
///
/// Construction validates the calibration matrix and caches the inverse
/// mapping from corrected to raw pixel coordinates, so the per-frame
/// work is a single bilinear resampling pass. Optionally rotates the
/// corrected frame 180 degrees to compensate an upside-down mount.
pub struct Undistorter {
    width: usize,
    height: usize,
    rotate_180: bool,
    map_x: FieldMatrix,
    map_y: FieldMatrix,
}

impl Undistorter {
    /// Validate the calibration and precompute the remap tables.
    pub fn new(
        calibration: &Calibration,
        width: usize,
        height: usize,
        rotate_180: bool,
    ) -> Result<Self, CalibrationError> {
        let (fx, fy) = calibration.intrinsics.focal;
        let (cx, cy) = calibration.intrinsics.principal_point;
        let skew = calibration.intrinsics.skew;
        // The intrinsic matrix is upper triangular: its determinant is fx * fy.
        let det = fx * fy;
        if !det.is_finite() || det.abs() < 1e-9 {
            return Err(CalibrationError::SingularMatrix);
        }
        let d = &calibration.distortion;
        let mut map_x = FieldMatrix::zeros(height, width);
        let mut map_y = FieldMatrix::zeros(height, width);
        for i in 0..height {
            for j in 0..width {
                // Normalized coordinates of the corrected pixel.
                let y = (i as f32 - cy) / fy;
                let x = (j as f32 - cx - skew * y) / fx;
                let r2 = x * x + y * y;
                let radial = 1.0 + d.k1 * r2 + d.k2 * r2 * r2 + d.k3 * r2 * r2 * r2;
                let x_d = x * radial + 2.0 * d.p1 * x * y + d.p2 * (r2 + 2.0 * x * x);
                let y_d = y * radial + d.p1 * (r2 + 2.0 * y * y) + 2.0 * d.p2 * x * y;
                map_x[(i, j)] = fx * x_d + skew * y_d + cx;
                map_y[(i, j)] = fy * y_d + cy;
            }
        }
        Ok(Undistorter {
            width,
            height,
            rotate_180,
            map_x,
            map_y,
        })
    }

    /// Dimensions (width, height) this undistorter was built for.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Produce the geometrically corrected frame.
    ///
    /// Pixels mapping outside the raw frame come out black.
    pub fn correct(&self, raw: &GrayMatrix) -> Result<GrayMatrix, CalibrationError> {
        let (rows, cols) = raw.shape();
        if rows != self.height || cols != self.width {
            return Err(CalibrationError::DimensionMismatch {
                width: self.width,
                height: self.height,
                found_width: cols,
                found_height: rows,
            });
        }
        let corrected = DMatrix::from_fn(self.height, self.width, |i, j| {
            let (si, sj) = if self.rotate_180 {
                (self.height - 1 - i, self.width - 1 - j)
            } else {
                (i, j)
            };
            match sample_bilinear(raw, self.map_x[(si, sj)], self.map_y[(si, sj)]) {
                Some(value) => value.round() as u8,
                None => 0,
            }
        });
        Ok(corrected)
    }
}
