use std::time::Duration;
use std::thread;
use log::debug;

/// Fixed pause between consecutive network-issuing steps.
///
/// The first step of a run goes out immediately; every later one waits
/// `delay` first, whether the previous step succeeded or not.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    issued: u64,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Throttle { delay, issued: 0 }
    }

    /// Call right before a network-issuing step.
    pub fn pace(&mut self, step: &str) {
        if self.issued > 0 && !self.delay.is_zero() {
            debug!("Waiting {} ms before {}...", self.delay.as_millis(), step);
            thread::sleep(self.delay);
        }
        self.issued += 1;
    }

    /// Number of network steps paced so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}
