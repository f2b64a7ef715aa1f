// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fixed-rate cycle scheduling.

use std::thread;
use std::time::{Duration, Instant};

use crate::misc::type_aliases::Float;

/// Enforces the target cycle period.
///
/// When a cycle overruns its period, the next one starts immediately and
/// the missed ticks are dropped, never queued: no catch-up burst under
/// sustained overload.
pub struct RateScheduler {
    period: Duration,
    deadline: Instant,
}

impl RateScheduler {
    /// Scheduler for the given target rate in Hz.
    ///
    /// The first call to `wait` returns immediately.
    pub fn new(rate: Float) -> RateScheduler {
        RateScheduler {
            period: Duration::from_secs_f64(1.0 / f64::from(rate)),
            deadline: Instant::now(),
        }
    }

    /// Block until the next cycle should start.
    pub fn wait(&mut self) {
        let (sleep, next) = next_deadline(self.deadline, Instant::now(), self.period);
        if let Some(pause) = sleep {
            thread::sleep(pause);
        }
        self.deadline = next;
    }
}

/// Deadline arithmetic, separated out for testing.
///
/// Before the deadline: sleep the remainder, advance by one period.
/// Past the deadline (overrun): no sleep, restart from now.
fn next_deadline(deadline: Instant, now: Instant, period: Duration) -> (Option<Duration>, Instant) {
    if now < deadline {
        (Some(deadline - now), deadline + period)
    } else {
        (None, now + period)
    }
}
