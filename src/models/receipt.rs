//! Receipt record as persisted and as handed to the UI.
//!
//! The JSON shape is `{ "id": number, "image": data-uri, "date": string,
//! "timestamp": ISO-8601 }`, one array of these per store.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::camera::ImageArtifact;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    /// Millisecond Unix timestamp of creation, bumped when needed to stay unique.
    pub id: i64,
    /// `data:image/jpeg;base64,...`
    pub image: String,
    /// Display date in the configured locale.
    pub date: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl Receipt {
    pub fn new(id: i64, artifact: &ImageArtifact, captured_at: DateTime<Utc>, locale: &str) -> Self {
        Self {
            id,
            image: artifact.to_data_uri(),
            date: format_display_date(captured_at, &Local, locale),
            timestamp: captured_at,
        }
    }

    pub fn image_bytes(&self) -> Option<Vec<u8>> {
        ImageArtifact::decode_data_uri(&self.image)
    }
}

fn date_pattern(locale: &str) -> &'static str {
    match locale {
        "ja-JP" | "ja" | "zh-CN" | "zh" => "%Y/%-m/%-d",
        "en-US" | "en" => "%-m/%-d/%Y",
        "en-GB" | "fr-FR" | "fr" | "es-ES" | "es" | "it-IT" | "it" => "%d/%m/%Y",
        "de-DE" | "de" => "%-d.%-m.%Y",
        "ko-KR" | "ko" => "%Y. %-m. %-d.",
        _ => "%Y-%m-%d",
    }
}

/// Calendar date of `at` in `tz`, written the way `locale` writes short dates.
/// Unknown locales fall back to ISO `YYYY-MM-DD`.
pub fn format_display_date<Tz>(at: DateTime<Utc>, tz: &Tz, locale: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.with_timezone(tz).format(date_pattern(locale)).to_string()
}

mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn sample_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 10, 30, 0).unwrap()
            + chrono::Duration::milliseconds(123)
    }

    #[test]
    fn serializes_to_stored_shape() {
        let receipt = Receipt {
            id: 1704450600123,
            image: "data:image/jpeg;base64,AAAA".into(),
            date: "2024/1/5".into(),
            timestamp: sample_time(),
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1704450600123i64,
                "image": "data:image/jpeg;base64,AAAA",
                "date": "2024/1/5",
                "timestamp": "2024-01-05T10:30:00.123Z",
            })
        );
    }

    #[test]
    fn parses_browser_iso_strings() {
        let raw = r#"{"id":1,"image":"data:image/jpeg;base64,","date":"2024/1/5","timestamp":"2024-01-05T10:30:00.123Z"}"#;
        let receipt: Receipt = serde_json::from_str(raw).unwrap();
        assert_eq!(receipt.timestamp, sample_time());
    }

    #[test]
    fn rejects_bad_timestamp() {
        let raw = r#"{"id":1,"image":"","date":"","timestamp":"yesterday"}"#;
        assert!(serde_json::from_str::<Receipt>(raw).is_err());
    }

    #[test]
    fn formats_dates_per_locale() {
        let at = sample_time();
        assert_eq!(format_display_date(at, &Utc, "ja-JP"), "2024/1/5");
        assert_eq!(format_display_date(at, &Utc, "en-US"), "1/5/2024");
        assert_eq!(format_display_date(at, &Utc, "en-GB"), "05/01/2024");
        assert_eq!(format_display_date(at, &Utc, "de-DE"), "5.1.2024");
        assert_eq!(format_display_date(at, &Utc, "xx-XX"), "2024-01-05");
    }

    #[test]
    fn display_date_follows_time_zone() {
        let late = Utc.with_ymd_and_hms(2024, 1, 5, 20, 0, 0).unwrap();
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(format_display_date(late, &tokyo, "ja-JP"), "2024/1/6");
    }
}
