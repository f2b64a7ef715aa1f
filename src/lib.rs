// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! # Visual Dead Reckoning in Rust (vdr)
//!
//! Estimate a ground vehicle's planar position, velocity and heading from
//! a camera frame sequence alone, with no wheel encoder or inertial
//! sensor. Each cycle, a raw frame is geometrically corrected, dense
//! optical flow against the previous frame is reduced to one displacement,
//! converted to a metric velocity, smoothed by per-axis filter chains,
//! integrated into a cumulative pose, and projected onto geodetic
//! coordinates around a fixed anchor. A fixed-rate scheduler drives the
//! whole loop.

pub mod core;
pub mod dataset;
pub mod device;
pub mod misc;
