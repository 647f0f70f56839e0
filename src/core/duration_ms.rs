//! Serialize a [`Duration`] as integer milliseconds.
//!
//! Use with `#[serde(with = "crate::core::duration_ms")]`.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serializes `duration` as whole milliseconds, saturating at `u64::MAX`.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    serializer.serialize_u64(millis)
}

/// Deserializes whole milliseconds into a `Duration`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timeouts {
        #[serde(with = "super")]
        connect: Duration,
    }

    #[test]
    fn test_millis_serde() {
        let json = serde_json::to_string(&Timeouts {
            connect: Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(json, r#"{"connect":5000}"#);

        let parsed: Timeouts = serde_json::from_str(r#"{"connect":250}"#).unwrap();
        assert_eq!(parsed.connect, Duration::from_millis(250));
    }
}
