//! Custom deserializers for fields of the Ed API and realtime stream.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};

/// Deserialize an identifier that the realtime stream encodes either as an
/// integer or as a string.
pub fn flexible_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(IdVisitor)
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an identifier encoded as integer or string")
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(v)
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        u64::try_from(v).map_err(|e| E::custom(e.to_string()))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.parse::<u64>().map_err(|e| E::custom(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Record {
        #[serde(deserialize_with = "super::flexible_id")]
        id: u64,
    }

    #[test]
    fn accepts_integer_ids() {
        let record: Record = serde_json::from_str(r#"{"id": 72681}"#).unwrap();
        assert_eq!(record.id, 72681);
    }

    #[test]
    fn accepts_string_ids() {
        let record: Record = serde_json::from_str(r#"{"id": "72681"}"#).unwrap();
        assert_eq!(record.id, 72681);
    }

    #[test]
    fn rejects_non_numeric_strings() {
        assert!(serde_json::from_str::<Record>(r#"{"id": "abc"}"#).is_err());
    }
}
