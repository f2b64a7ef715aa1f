// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dense differential optical flow between consecutive grayscale frames.
//!
//! Coarse-to-fine scheme: both frames are reduced to mean pyramids, and
//! at each level the flow field is refined by a few iterations of warped
//! temporal differences against windowed normal equations, then smoothed
//! with small box blurs. The dense field is finally reduced to a single
//! displacement by averaging the central region of the frame, which
//! suppresses edge distortion and vignetting artifacts.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::misc::helper::sample_bilinear;
use crate::misc::type_aliases::{FieldMatrix, GrayMatrix, Vec2};

/// A local normal matrix below this determinant is treated as
/// textureless and contributes no flow update.
const DET_EPSILON: f32 = 1e-6;

/// Parameters of the pyramidal flow estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of pyramid levels (1 uses only the full resolution).
    pub levels: usize,
    /// Window radius of the local normal equations, in pixels.
    pub window: usize,
    /// Refinement iterations per pyramid level.
    pub iterations: usize,
    /// Box-blur passes applied to the field after each level.
    pub smoothing: usize,
}

/// Dense per-pixel displacement between two consecutive frames.
///
/// Ephemeral: consumed within the cycle that produced it.
pub struct FlowField {
    /// Horizontal displacement of each pixel, in pixels.
    pub dx: FieldMatrix,
    /// Vertical displacement of each pixel, in pixels.
    pub dy: FieldMatrix,
}

impl FlowField {
    /// Average displacement over the central half of each dimension.
    pub fn mean_over_center(&self) -> Vec2 {
        let (rows, cols) = self.dx.shape();
        let (mut r0, mut r1) = (rows / 4, (3 * rows) / 4);
        let (mut c0, mut c1) = (cols / 4, (3 * cols) / 4);
        if r1 <= r0 || c1 <= c0 {
            // Frame too small for a central crop, fall back to all of it.
            r0 = 0;
            r1 = rows;
            c0 = 0;
            c1 = cols;
        }
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for i in r0..r1 {
            for j in c0..c1 {
                sum_x += self.dx[(i, j)];
                sum_y += self.dy[(i, j)];
            }
        }
        let count = ((r1 - r0) * (c1 - c0)) as f32;
        Vec2::new(sum_x / count, sum_y / count)
    }
}

/// Lifecycle of the estimator: the very first frame can only serve as
/// baseline and produces no motion estimate.
enum State {
    Priming,
    Ready { previous: Vec<FieldMatrix> },
}

/// Pyramidal dense flow estimator holding the previous-frame baseline.
pub struct Estimator {
    config: Config,
    state: State,
}

impl Estimator {
    /// New estimator in the priming state.
    pub fn new(config: Config) -> Self {
        Estimator {
            config,
            state: State::Priming,
        }
    }

    /// Feed the next corrected grayscale frame.
    ///
    /// Returns the averaged central displacement in pixels, or `None` on
    /// the priming frame. Both frames of a pair must have identical
    /// dimensions.
    pub fn estimate(&mut self, frame: &GrayMatrix) -> Option<Vec2> {
        let pyramid = pyramid(self.config.levels, frame);
        let shift = match &self.state {
            State::Priming => None,
            State::Ready { previous } => {
                debug_assert_eq!(previous[0].shape(), pyramid[0].shape());
                Some(self.field_between(previous, &pyramid).mean_over_center())
            }
        };
        self.state = State::Ready { previous: pyramid };
        shift
    }

    /// Coarse-to-fine dense flow from the previous pyramid to the
    /// current one.
    fn field_between(&self, previous: &[FieldMatrix], current: &[FieldMatrix]) -> FlowField {
        let coarsest = previous.len().min(current.len()) - 1;
        let (rows, cols) = previous[coarsest].shape();
        let mut dx = FieldMatrix::zeros(rows, cols);
        let mut dy = FieldMatrix::zeros(rows, cols);
        for level in (0..=coarsest).rev() {
            let template = &previous[level];
            let target = &current[level];
            if level != coarsest {
                let (rows, cols) = template.shape();
                dx = upsample(&dx, rows, cols);
                dy = upsample(&dy, rows, cols);
            }
            let (gx, gy) = gradients(template);
            for _ in 0..self.config.iterations {
                refine(template, target, &gx, &gy, &mut dx, &mut dy, self.config.window);
            }
            for _ in 0..self.config.smoothing {
                dx = box_blur(&dx);
                dy = box_blur(&dy);
            }
        }
        FlowField { dx, dy }
    }
}

/// Mean pyramid of the frame, finest level first.
fn pyramid(levels: usize, frame: &GrayMatrix) -> Vec<FieldMatrix> {
    let mut pyramid = Vec::with_capacity(levels.max(1));
    pyramid.push(frame.map(f32::from));
    for _ in 1..levels {
        match halve(pyramid.last().unwrap()) {
            Some(halved) => pyramid.push(halved),
            None => break,
        }
    }
    pyramid
}

/// Halve the resolution by averaging each 2x2 block.
/// Returns `None` once a dimension cannot be halved anymore.
fn halve(mat: &FieldMatrix) -> Option<FieldMatrix> {
    let (rows, cols) = mat.shape();
    let half_rows = rows / 2;
    let half_cols = cols / 2;
    if half_rows == 0 || half_cols == 0 {
        return None;
    }
    Some(DMatrix::from_fn(half_rows, half_cols, |i, j| {
        let a = mat[(2 * i, 2 * j)];
        let b = mat[(2 * i + 1, 2 * j)];
        let c = mat[(2 * i, 2 * j + 1)];
        let d = mat[(2 * i + 1, 2 * j + 1)];
        0.25 * (a + b + c + d)
    }))
}

/// Centered spatial gradients, zero on the frame border.
fn gradients(mat: &FieldMatrix) -> (FieldMatrix, FieldMatrix) {
    let (rows, cols) = mat.shape();
    let gx = DMatrix::from_fn(rows, cols, |i, j| {
        if j == 0 || j == cols - 1 {
            0.0
        } else {
            0.5 * (mat[(i, j + 1)] - mat[(i, j - 1)])
        }
    });
    let gy = DMatrix::from_fn(rows, cols, |i, j| {
        if i == 0 || i == rows - 1 {
            0.0
        } else {
            0.5 * (mat[(i + 1, j)] - mat[(i - 1, j)])
        }
    });
    (gx, gy)
}

/// One refinement iteration: warp the target by the current field, then
/// solve the windowed normal equations around each pixel and add the
/// resulting step to the field.
fn refine(
    template: &FieldMatrix,
    target: &FieldMatrix,
    gx: &FieldMatrix,
    gy: &FieldMatrix,
    dx: &mut FieldMatrix,
    dy: &mut FieldMatrix,
    window: usize,
) {
    let (rows, cols) = template.shape();
    // Temporal difference of the warped target against the template.
    // Pixels warped outside the frame carry no information.
    let residual = DMatrix::from_fn(rows, cols, |i, j| {
        let x = j as f32 + dx[(i, j)];
        let y = i as f32 + dy[(i, j)];
        match sample_bilinear(target, x, y) {
            Some(value) => value - template[(i, j)],
            None => 0.0,
        }
    });
    let radius = window as isize;
    let mut step_x = FieldMatrix::zeros(rows, cols);
    let mut step_y = FieldMatrix::zeros(rows, cols);
    for i in 0..rows {
        for j in 0..cols {
            // Windowed sums of the 2x2 normal matrix [a b; b c] and of
            // the gradient-weighted residual (rx, ry).
            let mut a = 0.0;
            let mut b = 0.0;
            let mut c = 0.0;
            let mut rx = 0.0;
            let mut ry = 0.0;
            for di in -radius..=radius {
                for dj in -radius..=radius {
                    let ii = i as isize + di;
                    let jj = j as isize + dj;
                    if ii < 0 || jj < 0 || ii >= rows as isize || jj >= cols as isize {
                        continue;
                    }
                    let (ii, jj) = (ii as usize, jj as usize);
                    let gxx = gx[(ii, jj)];
                    let gyy = gy[(ii, jj)];
                    let t = residual[(ii, jj)];
                    a += gxx * gxx;
                    b += gxx * gyy;
                    c += gyy * gyy;
                    rx += gxx * t;
                    ry += gyy * t;
                }
            }
            let det = a * c - b * b;
            if det > DET_EPSILON {
                step_x[(i, j)] = -(c * rx - b * ry) / det;
                step_y[(i, j)] = -(a * ry - b * rx) / det;
            }
        }
    }
    *dx += step_x;
    *dy += step_y;
}

/// Double the field resolution, doubling the displacement values.
fn upsample(field: &FieldMatrix, rows: usize, cols: usize) -> FieldMatrix {
    let (field_rows, field_cols) = field.shape();
    DMatrix::from_fn(rows, cols, |i, j| {
        2.0 * field[((i / 2).min(field_rows - 1), (j / 2).min(field_cols - 1))]
    })
}

/// 3x3 mean blur with clamped borders.
fn box_blur(field: &FieldMatrix) -> FieldMatrix {
    let (rows, cols) = field.shape();
    DMatrix::from_fn(rows, cols, |i, j| {
        let mut sum = 0.0;
        let mut count = 0.0;
        for di in -1isize..=1 {
            for dj in -1..=1 {
                let ii = i as isize + di;
                let jj = j as isize + dj;
                if ii >= 0 && jj >= 0 && ii < rows as isize && jj < cols as isize {
                    sum += field[(ii as usize, jj as usize)];
                    count += 1.0;
                }
            }
        }
        sum / count
    })
}
