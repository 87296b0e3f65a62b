use std::sync::{Arc, Mutex};

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

/// Wall-clock seam. Countdown and debounce logic read time through this
/// trait so tests can drive a manual clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Settable clock for tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());
        *now += by;
    }

    pub fn set(&self, to: OffsetDateTime) {
        let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|err| err.into_inner())
    }
}

pub fn format_rfc3339(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

/// Parse the datetime shapes the backend and the web frontend emit:
/// Rfc3339, plus the timezone-less `datetime-local` forms
/// `YYYY-MM-DDTHH:MM[:SS]` (assumed UTC).
pub fn parse_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]"
        ),
    ) {
        return Some(value.assume_utc());
    }

    None
}

pub(crate) mod serde_flexible {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_rfc3339(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_datetime_flexible(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw}")))
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::OffsetDateTime;

        pub fn serialize<S>(
            value: &Option<OffsetDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => serializer.serialize_some(&crate::core::time::format_rfc3339(*value)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw {
                Some(value) => crate::core::time::parse_datetime_flexible(&value)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {value}")))
                    .map(Some),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn parses_rfc3339() {
        let parsed = parse_datetime_flexible("2025-01-02T10:20:30Z").expect("rfc3339");
        assert_eq!(parsed, datetime!(2025-01-02 10:20:30 UTC));
    }

    #[test]
    fn parses_datetime_local_without_seconds() {
        let parsed = parse_datetime_flexible("2025-01-02T10:20").expect("datetime-local");
        assert_eq!(parsed, datetime!(2025-01-02 10:20:00 UTC));
    }

    #[test]
    fn parses_millisecond_form() {
        let parsed = parse_datetime_flexible("2025-01-02T10:20:30.500").expect("millis");
        assert_eq!(parsed, datetime!(2025-01-02 10:20:30.5 UTC));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime_flexible("not a date").is_none());
    }

    #[test]
    fn format_outputs_utc_z() {
        let value = datetime!(2025-01-02 10:20:30 UTC);
        assert_eq!(format_rfc3339(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(datetime!(2025-06-01 12:00:00 UTC));
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), datetime!(2025-06-01 12:01:30 UTC));
    }
}
