//! Chain timestamp parsing.

use chrono::{DateTime, NaiveDateTime, Utc};

/// The chain's "unknown time" sentinel.
pub const EPOCH_SENTINEL: &str = "1970-01-01T00:00:00.000";

/// Parse a chain timestamp (`2019-08-01T12:30:00.000`). Zoneless by
/// convention and always UTC. Returns `None` for empty or unparseable
/// input.
pub fn parse_chain_time(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain_time() {
        let parsed = parse_chain_time("2019-08-01T12:30:00.000").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2019-08-01T12:30:00+00:00");
    }

    #[test]
    fn test_parse_chain_time_rejects_garbage() {
        assert_eq!(parse_chain_time(""), None);
        assert_eq!(parse_chain_time("soon"), None);
    }
}
