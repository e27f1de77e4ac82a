use chrono::{DateTime, Duration, Utc};

/// New deadline after adding `by` to whichever is later: `now` or the current deadline.
///
/// Time that is already paid for is never discarded and a lapsed deadline never drags the
/// extension into the past.
pub fn extend_deadline(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    by: Duration,
) -> DateTime<Utc> {
    let base = match current {
        Some(current) if current > now => current,
        _ => now,
    };
    base + by
}

pub fn is_active(valid_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    valid_until.is_some_and(|until| until >= now)
}
