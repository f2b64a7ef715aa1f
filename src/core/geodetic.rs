// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Flat-Earth projection of the local pose onto geodetic coordinates.

use serde::{Deserialize, Serialize};

use crate::misc::type_aliases::Float;

/// A geodetic coordinate: latitude/longitude in degrees, altitude in
/// meters.
///
/// Stored as `f64` on purpose: offsets of 1e-7 degree vanish below the
/// `f32` resolution at mid latitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticFix {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: f64,
}

/// Startup configuration of the projector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Reference coordinate, anchored once at startup.
    pub anchor: GeodeticFix,
    /// Degrees of latitude per meter of local y displacement.
    pub k_lat: f64,
    /// Degrees of longitude per meter of local x displacement.
    pub k_lon: f64,
}

/// Offsets the anchor by the integrated local displacement.
///
/// Deliberate short-range linearization, not a geodesic projection: the
/// error grows with distance from the anchor. The anchor is never
/// re-anchored after startup.
pub struct Projector {
    config: Config,
}

impl Projector {
    /// New projector around the configured anchor.
    pub fn new(config: Config) -> Projector {
        Projector { config }
    }

    /// The startup anchor coordinate.
    pub fn anchor(&self) -> &GeodeticFix {
        &self.config.anchor
    }

    /// Project a local planar position onto a geodetic fix.
    pub fn project(&self, x: Float, y: Float) -> GeodeticFix {
        GeodeticFix {
            latitude: self.config.anchor.latitude + f64::from(y) * self.config.k_lat,
            longitude: self.config.anchor.longitude + f64::from(x) * self.config.k_lon,
            altitude: self.config.anchor.altitude,
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    fn projector() -> Projector {
        Projector::new(Config {
            anchor: GeodeticFix {
                latitude: 42.33,
                longitude: -71.2089,
                altitude: 12.0,
            },
            k_lat: 1e-7,
            k_lon: 1e-7,
        })
    }

    #[test]
    fn origin_projects_onto_the_anchor() {
        let fix = projector().project(0.0, 0.0);
        assert_eq!(*projector().anchor(), fix);
    }

    #[test]
    fn offsets_stay_above_f64_resolution() {
        let fix = projector().project(10.0, -5.0);
        assert_relative_eq!(42.33 - 5e-7, fix.latitude);
        assert_relative_eq!(-71.2089 + 1e-6, fix.longitude);
        assert_eq!(12.0, fix.altitude);
    }
}
