use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use rand::RngCore;
use serde::{Deserialize, Deserializer};

pub fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Times as GPX/TCX files and track CSVs write them: RFC 3339, or
/// `YYYY-MM-DD HH:MM:SS[.f]` with an optional `+HH:MM` offset. Times without
/// an offset are UTC.
pub fn parse_time(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    let s = input.replacen('/', "-", 2);
    if let Ok(dt) = DateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|dt| dt.and_utc())
        .map_err(|_| anyhow!("unrecognized time: {input:?}"))
}

pub fn deserialize_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw).map_err(serde::de::Error::custom)
}

/// Heart rate written either as an integer or as a float such as `120.0`.
pub fn deserialize_bpm<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match present(Option::<f64>::deserialize(deserializer)?) {
        None => Ok(None),
        Some(bpm) if bpm >= 0.0 && bpm.fract() == 0.0 && bpm <= u32::MAX as f64 => {
            Ok(Some(bpm as u32))
        }
        Some(bpm) => Err(serde::de::Error::custom(format!("invalid heart rate: {bpm}"))),
    }
}

/// Same layout pandas uses when writing timezone-aware timestamps.
pub fn format_csv_time(time: &DateTime<Utc>) -> String {
    if time.nanosecond() == 0 {
        time.format("%Y-%m-%d %H:%M:%S%:z").to_string()
    } else {
        time.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
    }
}

/// `MM:SS` of the minute within the hour, the way the speed charts label time.
pub fn format_mm_ss(seconds: f64) -> String {
    let total = seconds.floor() as i64;
    let minutes = total.div_euclid(60).rem_euclid(60);
    let secs = total.rem_euclid(60);
    format!("{minutes:02}:{secs:02}")
}

pub fn token_hex(num_bytes: usize) -> String {
    let mut bytes = vec![0u8; num_bytes];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Reduce a client supplied file name to something safe to put on disk.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(|c| c.is_ascii())
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}
