// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Type aliases for common types used all over the code base.

use nalgebra as na;

/// Estimation is done in f32.
/// Geodetic coordinates are the exception and use f64 (see `core::geodetic`).
pub type Float = f32;

/// A vector with two Float coordinates, used for pixel displacements
/// and planar velocities.
pub type Vec2 = na::Vector2<Float>;

/// A grayscale frame buffer, in (row, column) indexing.
pub type GrayMatrix = na::DMatrix<u8>;

/// A dense per-pixel scalar field: one flow component, a remap table, ...
pub type FieldMatrix = na::DMatrix<f32>;
