use chrono::{DateTime, Duration, Utc};

/// `now - timestamp >= ttl`, the shared staleness rule every TTL cache and
/// cooldown window in this workspace uses.
pub fn is_stale(timestamp: DateTime<Utc>, ttl_seconds: u64, now: DateTime<Utc>) -> bool {
    now - timestamp >= Duration::seconds(ttl_seconds as i64)
}

pub fn seconds_from_now(seconds: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(seconds)
}
