use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

/// Deserialize an `f64` that the feed may encode either as a JSON number or as a numeric
/// `String` (eg/ OHLC values are quoted, tick prices are not).
pub fn de_flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::String(value) => value.parse::<f64>().map_err(serde::de::Error::custom),
    }
}

/// Deserialize an optional `f64` that may be encoded as a JSON number or numeric `String`.
pub fn de_flexible_f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "de_flexible_f64")] f64);

    Option::<Wrapper>::deserialize(deserializer).map(|wrapper| wrapper.map(|Wrapper(value)| value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Price {
        #[serde(deserialize_with = "de_flexible_f64")]
        value: f64,
        #[serde(default, deserialize_with = "de_flexible_f64_opt")]
        volume: Option<f64>,
    }

    #[test]
    fn test_de_flexible_f64() {
        let number: Price = serde_json::from_str(r#"{"value": 1.5}"#).unwrap();
        assert_eq!(number.value, 1.5);
        assert_eq!(number.volume, None);

        let string: Price =
            serde_json::from_str(r#"{"value": "1234.25", "volume": "3"}"#).unwrap();
        assert_eq!(string.value, 1234.25);
        assert_eq!(string.volume, Some(3.0));

        assert!(serde_json::from_str::<Price>(r#"{"value": "abc"}"#).is_err());
    }
}
