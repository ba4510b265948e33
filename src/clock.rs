//! Time source for stamping.

use chrono::{DateTime, Utc};

/// Where the middleware reads "now" from.
///
/// Both timestamps of an exchange come from the same clock, so a response
/// stamp can never precede its request stamp unless the clock itself goes
/// backwards.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time in UTC. The default.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
