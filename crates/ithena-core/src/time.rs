//! Canonical timestamp helpers.
//!
//! Unlike a deterministic/replayable core, this wrapper's audit trail is a
//! wall-clock observability artifact: every timestamp is the real time the
//! event happened, encoded as RFC 3339 with nanosecond precision in UTC.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Returns the current wall-clock time as RFC 3339 with nanosecond precision, UTC.
///
/// Falls back to the Unix epoch string if formatting ever fails (it cannot in
/// practice for `Rfc3339`, but the core never panics on a logging path).
#[must_use]
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00.000000000Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_rfc3339_parses_back() {
        let stamp = now_rfc3339();
        assert!(OffsetDateTime::parse(&stamp, &Rfc3339).is_ok());
    }
}
