// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Telemetry output boundary.

use std::error::Error;

use crate::core::pipeline::NavUpdate;

/// Consumer of one pose/fix per completed cycle.
///
/// Implementations must not block the estimation loop and must not
/// mutate any pipeline state. Emit failures are logged by the loop and
/// otherwise ignored, never fatal.
pub trait TelemetrySink {
    /// Deliver one update.
    fn emit(&mut self, update: &NavUpdate) -> Result<(), Box<dyn Error>>;
}

/// Prints one update per line to stdout.
pub struct ConsoleSink;

impl TelemetrySink for ConsoleSink {
    fn emit(&mut self, update: &NavUpdate) -> Result<(), Box<dyn Error>> {
        println!("{}", update);
        Ok(())
    }
}
