// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Planar pose accumulation by explicit Euler integration.

use serde::{Deserialize, Serialize};

use crate::misc::type_aliases::{Float, Vec2};

/// Mounting-orientation mapping from camera axes to vehicle axes,
/// applied once per cycle before integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Swap the camera x/y axes.
    pub swap: bool,
    /// Negate the (post-swap) x axis.
    pub flip_x: bool,
    /// Negate the (post-swap) y axis.
    pub flip_y: bool,
}

impl AxisConfig {
    /// Apply the swap and signs to a camera-frame vector.
    pub fn apply(&self, v: Vec2) -> Vec2 {
        let (x, y) = if self.swap { (v.y, v.x) } else { (v.x, v.y) };
        Vec2::new(
            if self.flip_x { -x } else { x },
            if self.flip_y { -y } else { y },
        )
    }
}

/// Cumulative planar pose of the vehicle.
///
/// Position changes only through integration, or through an explicit
/// reset back to the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseEstimate {
    /// Position along the vehicle x axis, in meters.
    pub x: Float,
    /// Position along the vehicle y axis, in meters.
    pub y: Float,
    /// Velocity along the vehicle x axis, in meters per second.
    pub vx: Float,
    /// Velocity along the vehicle y axis, in meters per second.
    pub vy: Float,
    /// Heading in radians, in (-pi, pi].
    pub heading: Float,
    /// Timestamp of the cycle that produced this pose, in seconds.
    pub timestamp: f64,
}

/// Explicit Euler integrator at the fixed cycle interval `dt = 1/rate`.
pub struct Integrator {
    dt: Float,
    axes: AxisConfig,
    pose: PoseEstimate,
}

impl Integrator {
    /// New integrator at the origin.
    pub fn new(rate: Float, axes: AxisConfig) -> Integrator {
        Integrator {
            dt: 1.0 / rate,
            axes,
            pose: PoseEstimate {
                x: 0.0,
                y: 0.0,
                vx: 0.0,
                vy: 0.0,
                heading: 0.0,
                timestamp: 0.0,
            },
        }
    }

    /// One integration step.
    ///
    /// `velocity` is the filtered metric velocity; `shift` is the
    /// pre-filter pixel displacement, from which the heading is taken.
    /// When the displacement is exactly zero the previous heading is
    /// kept, so the heading is never undefined.
    pub fn step(&mut self, velocity: Vec2, shift: Vec2, timestamp: f64) -> &PoseEstimate {
        let v = self.axes.apply(velocity);
        let s = self.axes.apply(shift);
        self.pose.vx = v.x;
        self.pose.vy = v.y;
        self.pose.x += v.x * self.dt;
        self.pose.y += v.y * self.dt;
        if s.x != 0.0 || s.y != 0.0 {
            self.pose.heading = s.y.atan2(s.x);
        }
        self.pose.timestamp = timestamp;
        &self.pose
    }

    /// Current cumulative pose.
    pub fn pose(&self) -> &PoseEstimate {
        &self.pose
    }

    /// Zero position and velocity, back to the origin.
    ///
    /// Heading and everything outside the integrator (filters,
    /// calibration, previous-frame baseline) are untouched. Idempotent.
    pub fn reset(&mut self) {
        self.pose.x = 0.0;
        self.pose.y = 0.0;
        self.pose.vx = 0.0;
        self.pose.vy = 0.0;
    }
}
