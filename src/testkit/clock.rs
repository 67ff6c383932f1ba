//! Pinned time for deterministic range resolution.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::adapter::outbound::clock::FixedClock;
use crate::application::range::RangeResolver;

/// Wednesday 2024-03-20 12:00:00 UTC. 2024 is a leap year.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// A clock stopped at [`now`].
pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(now()))
}

/// A resolver with only the built-in ranges, reading [`now`].
pub fn resolver() -> RangeResolver {
    RangeResolver::new(fixed_clock())
}
