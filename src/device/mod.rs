// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Boundary adapters around the estimation core: frame sources,
//! telemetry sinks, fixed-rate scheduling and the loop runner.

pub mod capture;
pub mod runner;
pub mod schedule;
pub mod telemetry;
