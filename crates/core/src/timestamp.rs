//! Wall-clock timestamps as stored in conversation files.
//!
//! Conversation files carry local times formatted as `YYYY-MM-DD HH:MM:SS`.
//! Because the format is fixed-width, string order equals time order.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serializer, de::Error};

pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time truncated to whole seconds
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.format(FORMAT).to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&s, FORMAT)
        .map_err(|e| Error::custom(format!("invalid timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Stamped {
        #[serde(with = "super")]
        at: NaiveDateTime,
    }

    #[test]
    fn test_parses_stored_format() {
        let stamped: Stamped = serde_json::from_str(r#"{"at": "2025-01-31 08:05:09"}"#).unwrap();
        assert_eq!(stamped.at.format(FORMAT).to_string(), "2025-01-31 08:05:09");
        let json = serde_json::to_string(&stamped).unwrap();
        assert_eq!(json, r#"{"at":"2025-01-31 08:05:09"}"#);
    }

    #[test]
    fn test_rejects_other_formats() {
        let result = serde_json::from_str::<Stamped>(r#"{"at": "2025-01-31T08:05:09Z"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_now_has_no_subsecond_part() {
        let at = now();
        assert_eq!(at.nanosecond(), 0);
        let reparsed = NaiveDateTime::parse_from_str(&at.format(FORMAT).to_string(), FORMAT).unwrap();
        assert_eq!(reparsed, at);
    }
}
