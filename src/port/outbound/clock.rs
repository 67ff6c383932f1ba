//! Time source port.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Supplies the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The current instant viewed in `tz`.
    fn now_in(&self, tz: Tz) -> DateTime<Tz> {
        self.now().with_timezone(&tz)
    }
}
