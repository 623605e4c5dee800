//! Human readable durations for probe configuration
//!
//! Accepts either a bare integer (seconds) or a string with a unit suffix
//! (`500ms`, `10s`, `5m`, `1h`). Serializes back to `<n>ms` or `<n>s`.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (value, unit) = input.split_at(split);

    let value: u64 = value
        .parse()
        .map_err(|_| format!("invalid duration '{input}'"))?;

    let secs = match unit.trim() {
        "ms" => return Ok(Duration::from_millis(value)),
        "" | "s" => Some(value),
        "m" => value.checked_mul(60),
        "h" => value.checked_mul(60 * 60),
        other => return Err(format!("unknown duration unit '{other}' in '{input}'")),
    };

    secs.map(Duration::from_secs)
        .ok_or_else(|| format!("duration out of range '{input}'"))
}

pub fn format_duration(duration: &Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(duration))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
        RawDuration::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
