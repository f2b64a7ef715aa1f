// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The full estimation pipeline, built once at startup.
//!
//! One `Pipeline` object owns the calibration, the previous-frame
//! baseline, the filter states and the cumulative pose; every stage gets
//! them passed explicitly, there is no module-level mutable state. One
//! call to [`Pipeline::process`] runs one cycle:
//! undistort → dense flow → deadzone → metric scaling → filter chains →
//! pose integration → geodetic projection.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::calibration::{Calibration, CalibrationError};
use crate::core::filter::{self, FilterDivergence};
use crate::core::flow;
use crate::core::geodetic::{self, GeodeticFix};
use crate::core::pose::{self, PoseEstimate};
use crate::core::scale;
use crate::core::undistort::Undistorter;
use crate::misc::type_aliases::{Float, GrayMatrix, Vec2};

/// Complete startup configuration of the pipeline.
///
/// Immutable once the pipeline is built; the only state change an
/// external caller can trigger afterwards is [`Pipeline::reset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Session frame width, in pixels.
    pub width: usize,
    /// Session frame height, in pixels.
    pub height: usize,
    /// Target cycle rate, in Hz.
    pub rate: Float,
    /// Camera calibration model.
    pub calibration: Calibration,
    /// Compensate an upside-down camera mount.
    pub rotate_180: bool,
    /// Dense flow parameters.
    pub flow: flow::Config,
    /// Pixel-to-metric conversion constants.
    pub scale: scale::Config,
    /// Per-axis velocity filter chains.
    pub filter: filter::Config,
    /// Camera-to-vehicle axis mapping.
    pub axes: pose::AxisConfig,
    /// Geodetic anchor and conversion constants.
    pub geodetic: geodetic::Config,
}

impl Config {
    /// Validate the configuration and build the pipeline.
    pub fn init(self) -> Result<Pipeline, CalibrationError> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(CalibrationError::InvalidRate);
        }
        if self.flow.levels == 0 {
            return Err(CalibrationError::InvalidLevels);
        }
        let undistorter =
            Undistorter::new(&self.calibration, self.width, self.height, self.rotate_180)?;
        let chain_x = filter::Chain::new(&self.filter)?;
        let chain_y = filter::Chain::new(&self.filter)?;
        Ok(Pipeline {
            undistorter,
            flow: flow::Estimator::new(self.flow),
            scale: scale::Converter::new(self.rate, self.scale),
            motion_threshold: self.filter.motion_threshold,
            chain_x,
            chain_y,
            integrator: pose::Integrator::new(self.rate, self.axes),
            projector: geodetic::Projector::new(self.geodetic),
        })
    }
}

/// One pose/fix produced per completed cycle for telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct NavUpdate {
    /// Capture timestamp of the frame that produced this update.
    pub timestamp: f64,
    /// Projected geodetic fix.
    pub fix: GeodeticFix,
    /// Vehicle-frame velocity (vx, vy, vz) in meters per second;
    /// vz is always zero for a ground vehicle.
    pub velocity: (Float, Float, Float),
    /// Heading in radians.
    pub heading: Float,
}

/// `timestamp lat lon alt vx vy vz heading`
impl fmt::Display for NavUpdate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {:.7} {:.7} {:.2} {:.4} {:.4} {:.4} {:.4}",
            self.timestamp,
            self.fix.latitude,
            self.fix.longitude,
            self.fix.altitude,
            self.velocity.0,
            self.velocity.1,
            self.velocity.2,
            self.heading,
        )
    }
}

/// Errors that abort the estimation loop.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Startup misconfiguration, or a frame violating the session setup.
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    /// Numeric corruption of a filter chain.
    #[error(transparent)]
    Divergence(#[from] FilterDivergence),
}

/// The assembled estimation pipeline.
pub struct Pipeline {
    undistorter: Undistorter,
    flow: flow::Estimator,
    scale: scale::Converter,
    motion_threshold: Float,
    chain_x: filter::Chain,
    chain_y: filter::Chain,
    integrator: pose::Integrator,
    projector: geodetic::Projector,
}

impl Pipeline {
    /// Run one cycle on a raw grayscale frame.
    ///
    /// Returns `Ok(None)` while the flow estimator is priming (the very
    /// first frame only serves as baseline).
    pub fn process(
        &mut self,
        frame: &GrayMatrix,
        timestamp: f64,
    ) -> Result<Option<NavUpdate>, PipelineError> {
        let corrected = self.undistorter.correct(frame)?;
        let shift = match self.flow.estimate(&corrected) {
            Some(shift) => shift,
            None => return Ok(None),
        };
        let shift = filter::deadzone(shift, self.motion_threshold);
        let raw_velocity = self.scale.velocity(shift);
        let vx = self.chain_x.push(raw_velocity.x)?;
        let vy = self.chain_y.push(raw_velocity.y)?;
        let pose = self.integrator.step(Vec2::new(vx, vy), shift, timestamp);
        let fix = self.projector.project(pose.x, pose.y);
        Ok(Some(NavUpdate {
            timestamp,
            fix,
            velocity: (pose.vx, pose.vy, 0.0),
            heading: pose.heading,
        }))
    }

    /// Current cumulative pose.
    pub fn pose(&self) -> &PoseEstimate {
        self.integrator.pose()
    }

    /// Zero position and velocity.
    ///
    /// Filter chains, calibration and the previous-frame baseline keep
    /// their state. Idempotent.
    pub fn reset(&mut self) {
        self.integrator.reset();
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::core::calibration::{Distortion, Intrinsics};
    use crate::core::filter::SmoothingConfig;
    use nalgebra::DMatrix;

    const WIDTH: usize = 64;
    const HEIGHT: usize = 48;
    const RATE: Float = 10.0;
    const ALTITUDE: Float = 0.2;
    const REFERENCE_FOCAL: Float = 100.0;

    fn test_config(motion_threshold: Float) -> Config {
        Config {
            width: WIDTH,
            height: HEIGHT,
            rate: RATE,
            calibration: Calibration {
                intrinsics: Intrinsics {
                    principal_point: (31.5, 23.5),
                    // Power-of-two focals keep the identity mapping exact.
                    focal: (64.0, 64.0),
                    skew: 0.0,
                },
                distortion: Distortion::default(),
            },
            rotate_180: false,
            flow: flow::Config {
                levels: 2,
                window: 2,
                iterations: 4,
                smoothing: 1,
            },
            scale: scale::Config {
                altitude: ALTITUDE,
                scalars: (1.0, 1.0),
                reference_focal: REFERENCE_FOCAL,
            },
            filter: filter::Config {
                taps: vec![0.1, 0.2, 0.4, 0.2, 0.1],
                smoothing: SmoothingConfig::Recursive {
                    process_variance: 1.0,
                    measurement_variance: 0.01,
                },
                motion_threshold,
            },
            axes: pose::AxisConfig {
                swap: false,
                flip_x: false,
                flip_y: false,
            },
            geodetic: geodetic::Config {
                anchor: GeodeticFix {
                    latitude: 42.33,
                    longitude: -71.2089,
                    altitude: ALTITUDE as f64,
                },
                k_lat: 1e-7,
                k_lon: 1e-7,
            },
        }
    }

    fn shifted_frame(shift: f32) -> GrayMatrix {
        DMatrix::from_fn(HEIGHT, WIDTH, |i, j| {
            let x = j as f32 - shift;
            let y = i as f32;
            let value = 128.0
                + 50.0 * (0.25 * x).sin() * (0.2 * y).cos()
                + 30.0 * (0.1 * (x + y)).sin();
            value.round() as u8
        })
    }

    #[test]
    fn static_scene_stays_at_the_origin() {
        let mut pipeline = test_config(0.05).init().unwrap();
        let frame = shifted_frame(0.0);
        assert!(pipeline.process(&frame, 0.0).unwrap().is_none());
        for cycle in 1..=10 {
            let update = pipeline.process(&frame, cycle as f64 * 0.1).unwrap().unwrap();
            assert!(update.velocity.0.abs() < 1e-4);
            assert!(update.velocity.1.abs() < 1e-4);
        }
        assert!(pipeline.pose().x.abs() < 1e-4);
        assert!(pipeline.pose().y.abs() < 1e-4);
    }

    #[test]
    fn constant_shift_integrates_to_the_predicted_position() {
        let mut pipeline = test_config(0.05).init().unwrap();
        let shift = 2.0;
        let cycles = 24;
        pipeline.process(&shifted_frame(0.0), 0.0).unwrap();
        for n in 1..=cycles {
            let frame = shifted_frame(shift * n as f32);
            pipeline.process(&frame, n as f64 * 0.1).unwrap().unwrap();
        }
        let dt = 1.0 / RATE;
        let expected =
            cycles as Float * RATE * ALTITUDE * shift.atan2(REFERENCE_FOCAL) * dt;
        let actual = pipeline.pose().x;
        // Tolerance covers the filter warm-up (about three cycles of
        // deficit) and the flow estimation error.
        assert!(
            (actual - expected).abs() < 0.25 * expected,
            "position {} vs predicted {}",
            actual,
            expected
        );
        assert!(pipeline.pose().y.abs() < 0.25 * expected);
    }

    #[test]
    fn sub_threshold_displacement_contributes_nothing() {
        let mut pipeline = test_config(10.0).init().unwrap();
        pipeline.process(&shifted_frame(0.0), 0.0).unwrap();
        for n in 1..=8 {
            let frame = shifted_frame(2.0 * n as f32);
            pipeline.process(&frame, n as f64 * 0.1).unwrap().unwrap();
        }
        assert_eq!(0.0, pipeline.pose().x);
        assert_eq!(0.0, pipeline.pose().y);
    }

    #[test]
    fn reset_returns_to_the_origin_and_keeps_filters_warm() {
        let mut pipeline = test_config(0.05).init().unwrap();
        pipeline.process(&shifted_frame(0.0), 0.0).unwrap();
        for n in 1..=12 {
            pipeline
                .process(&shifted_frame(2.0 * n as f32), n as f64 * 0.1)
                .unwrap()
                .unwrap();
        }
        let velocity_before = pipeline.pose().vx;
        let heading_before = pipeline.pose().heading;
        pipeline.reset();
        pipeline.reset();
        assert_eq!(0.0, pipeline.pose().x);
        assert_eq!(0.0, pipeline.pose().y);
        assert_eq!(0.0, pipeline.pose().vx);
        assert_eq!(heading_before, pipeline.pose().heading);
        // Warm filters: the very next cycle runs at cruise velocity.
        let update = pipeline
            .process(&shifted_frame(26.0), 1.3)
            .unwrap()
            .unwrap();
        assert!(
            (update.velocity.0 - velocity_before).abs() < 0.3 * velocity_before.abs(),
            "velocity after reset: {} vs {}",
            update.velocity.0,
            velocity_before
        );
    }

    #[test]
    fn config_round_trips_through_json() {
        let json = serde_json::to_string(&test_config(0.05)).unwrap();
        let config: Config = serde_json::from_str(&json).unwrap();
        assert!(config.init().is_ok());
    }

    #[test]
    fn nav_update_prints_one_line_for_telemetry() {
        let update = NavUpdate {
            timestamp: 12.5,
            fix: GeodeticFix {
                latitude: 42.33,
                longitude: -71.2089,
                altitude: 0.2,
            },
            velocity: (0.25, -0.5, 0.0),
            heading: 1.5,
        };
        assert_eq!(
            "12.5 42.3300000 -71.2089000 0.20 0.2500 -0.5000 0.0000 1.5000",
            update.to_string()
        );
    }
}
