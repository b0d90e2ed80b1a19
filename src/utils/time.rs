//! RFC 3339 timestamps at millisecond precision.
//!
//! Used as `#[serde(with = "crate::utils::time")]` on every persisted
//! instant, so a session written to storage reads back equal to the
//! millisecond.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// The current UTC time, truncated to whole milliseconds.
pub fn now_millis() -> OffsetDateTime {
    truncate_to_millis(OffsetDateTime::now_utc())
}

/// Drop sub-millisecond precision from `datetime`.
pub fn truncate_to_millis(datetime: OffsetDateTime) -> OffsetDateTime {
    datetime
        .replace_millisecond(datetime.millisecond())
        .unwrap_or(datetime)
}

/// Deserialize an RFC 3339 formatted string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339)
        .map(truncate_to_millis)
        .map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = truncate_to_millis(*datetime)
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use time::macros::datetime;

    #[derive(Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Stamp {
        #[serde(with = "super")]
        at: OffsetDateTime,
    }

    #[test]
    fn truncates_nanoseconds() {
        let precise = datetime!(2025-06-01 10:20:30.123_456_789 UTC);
        assert_eq!(
            truncate_to_millis(precise),
            datetime!(2025-06-01 10:20:30.123 UTC)
        );
    }

    #[test]
    fn round_trip_is_millisecond_exact() {
        let stamp = Stamp {
            at: datetime!(2025-06-01 10:20:30.123 UTC),
        };
        let json = serde_json::to_string(&stamp).unwrap();
        assert_eq!(json, r#"{"at":"2025-06-01T10:20:30.123Z"}"#);
        let back: Stamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stamp);
    }

    #[test]
    fn accepts_offsets() {
        let back: Stamp = serde_json::from_str(r#"{"at":"2025-06-01T12:20:30.5+02:00"}"#).unwrap();
        assert_eq!(back.at, datetime!(2025-06-01 10:20:30.5 UTC));
    }

    #[test]
    fn now_has_no_sub_millisecond_part() {
        assert_eq!(now_millis().nanosecond() % 1_000_000, 0);
    }
}
