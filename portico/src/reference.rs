//! Client correlation identifiers.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Caller-supplied correlation id attached to charge and authorize calls.
///
/// Text that parses as a UUID becomes [`ClientReference::Uuid`]; anything else
/// is kept verbatim as [`ClientReference::Opaque`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientReference {
    /// A syntactically valid UUID.
    Uuid(Uuid),
    /// Any other text, passed through untouched.
    Opaque(String),
}

impl ClientReference {
    /// Parses `text`, falling back to an opaque reference.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Uuid::parse_str(text).map_or_else(|_| Self::Opaque(text.to_owned()), Self::Uuid)
    }

    /// Returns `true` if the reference is a structured UUID.
    #[must_use]
    pub const fn is_uuid(&self) -> bool {
        matches!(self, Self::Uuid(_))
    }
}

impl From<Uuid> for ClientReference {
    fn from(uuid: Uuid) -> Self {
        Self::Uuid(uuid)
    }
}

impl fmt::Display for ClientReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(uuid) => write!(f, "{uuid}"),
            Self::Opaque(text) => f.write_str(text),
        }
    }
}

impl Serialize for ClientReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClientReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = deserializer.deserialize_any(TextVisitor)?;
        Ok(Self::parse(&text))
    }
}

/// Reads a JSON string or number as its text form.
pub(crate) struct TextVisitor;

impl Visitor<'_> for TextVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or a number")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
        Ok(value.to_owned())
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<String, E> {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uuid() {
        let reference = ClientReference::parse("67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert!(reference.is_uuid());
        assert_eq!(reference.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn test_parse_opaque_is_preserved() {
        let reference = ClientReference::parse("order-42/retry");
        assert_eq!(reference, ClientReference::Opaque("order-42/retry".into()));
    }

    #[test]
    fn test_deserialize_invalid_uuid_does_not_fail() {
        let reference: ClientReference = serde_json::from_str("\"not-a-uuid\"").unwrap();
        assert_eq!(reference.to_string(), "not-a-uuid");
    }

    #[test]
    fn test_deserialize_number_is_opaque() {
        let reference: ClientReference = serde_json::from_str("12345").unwrap();
        assert_eq!(reference, ClientReference::Opaque("12345".into()));
    }

    #[test]
    fn test_deserialize_rejects_objects() {
        assert!(serde_json::from_str::<ClientReference>("{}").is_err());
    }

    #[test]
    fn test_serialize_as_string() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&ClientReference::from(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
