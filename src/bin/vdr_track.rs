// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::env;
use std::error::Error;
use std::fs;
use std::sync::atomic::AtomicBool;

use visual_dead_reckoning_rs::core::pipeline;
use visual_dead_reckoning_rs::dataset::replay::{self, ReplaySource};
use visual_dead_reckoning_rs::device::runner;
use visual_dead_reckoning_rs::device::schedule::RateScheduler;
use visual_dead_reckoning_rs::device::telemetry::ConsoleSink;

fn main() {
    let args: Vec<String> = env::args().collect();
    if let Err(error) = run(&args) {
        eprintln!("{:?}", error);
    }
}

const USAGE: &str = "Usage: ./vdr_track config_file index_file";

/// Replay a recorded frame sequence through the estimation pipeline and
/// print one fix per completed cycle:
/// `timestamp lat lon alt vx vy vz heading`.
fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    // Check that the arguments are correct.
    let (config_path, index_path) = if let [_, config_path, index_path] = args {
        (config_path, index_path)
    } else {
        eprintln!("{}", USAGE);
        return Err("Wrong number of arguments".into());
    };

    // Load the startup configuration and build the pipeline.
    let config: pipeline::Config = serde_json::from_str(&fs::read_to_string(config_path)?)?;
    let rate = config.rate;
    let mut pipeline = config.init()?;

    // Replay the recorded sequence at the configured rate.
    let source = ReplaySource::new(replay::read_index(index_path)?);
    let mut scheduler = RateScheduler::new(rate);
    let cancel = AtomicBool::new(false);
    runner::run(
        &mut pipeline,
        source,
        &mut ConsoleSink,
        &mut scheduler,
        &cancel,
    )?;
    Ok(())
}
