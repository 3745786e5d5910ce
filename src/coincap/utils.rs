use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, de};

/* CoinCap sends decimals as JSON strings, e.g. "6929.8217756835584756" */

pub fn string_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_decimal::<D::Error>(&raw)
}

pub fn option_string_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_decimal::<D::Error>(&raw).map(Some),
        None => Ok(None),
    }
}

fn parse_decimal<E: de::Error>(raw: &str) -> Result<f64, E> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| E::custom(format!("invalid decimal string: {raw:?}")))?;

    if !value.is_finite() {
        return Err(E::custom(format!("non-finite decimal: {raw:?}")));
    }

    Ok(value)
}

pub fn timestamp_to_utc(timestamp_ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(timestamp_ms).single()
}
