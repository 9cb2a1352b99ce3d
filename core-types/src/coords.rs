//! Signed decimal-degree GPS coordinates.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseCoordinateError {
    #[error("coordinate string {0:?} is missing its leading + or - sign")]
    MissingSign(String),
    #[error("coordinate string {0:?} is not a signed decimal number")]
    InvalidNumber(String),
}

/// A GPS coordinate in signed decimal degrees.
///
/// Metadata tools emit coordinates either as JSON numbers or as
/// strings such as `"+45.4641"` / `"-12.3456"`. The string form must
/// carry an explicit sign: an unsigned string is a parse error, never
/// a silently positive value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SignedDegrees(f64);

impl SignedDegrees {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for SignedDegrees {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl FromStr for SignedDegrees {
    type Err = ParseCoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with('+') && !s.starts_with('-') {
            return Err(ParseCoordinateError::MissingSign(s.to_string()));
        }
        let value: f64 = s
            .parse()
            .map_err(|_| ParseCoordinateError::InvalidNumber(s.to_string()))?;
        if !value.is_finite() {
            return Err(ParseCoordinateError::InvalidNumber(s.to_string()));
        }
        Ok(Self(value))
    }
}

impl fmt::Display for SignedDegrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

impl Serialize for SignedDegrees {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for SignedDegrees {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DegreesVisitor;

        impl<'de> Visitor<'de> for DegreesVisitor {
            type Value = SignedDegrees;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or an explicitly signed decimal string")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(SignedDegrees(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(SignedDegrees(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(SignedDegrees(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(DegreesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_strings() {
        let lat: SignedDegrees = "+45.4641".parse().unwrap();
        assert_eq!(lat.value(), 45.4641);

        let lon: SignedDegrees = "-12.3456".parse().unwrap();
        assert_eq!(lon.value(), -12.3456);
    }

    #[test]
    fn rejects_unsigned_strings() {
        let err = "45.4641".parse::<SignedDegrees>().unwrap_err();
        assert_eq!(err, ParseCoordinateError::MissingSign("45.4641".into()));
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(matches!(
            "+north".parse::<SignedDegrees>(),
            Err(ParseCoordinateError::InvalidNumber(_))
        ));
        assert!(matches!(
            "+".parse::<SignedDegrees>(),
            Err(ParseCoordinateError::InvalidNumber(_))
        ));
        assert!(matches!(
            "+inf".parse::<SignedDegrees>(),
            Err(ParseCoordinateError::InvalidNumber(_))
        ));
    }

    #[test]
    fn deserializes_numbers_and_signed_strings() {
        let from_number: SignedDegrees = serde_json::from_str("45.4641").unwrap();
        assert_eq!(from_number.value(), 45.4641);

        let from_string: SignedDegrees = serde_json::from_str("\"-9.1393\"").unwrap();
        assert_eq!(from_string.value(), -9.1393);

        let unsigned: Result<SignedDegrees, _> = serde_json::from_str("\"9.1393\"");
        assert!(unsigned.is_err());
    }

    #[test]
    fn displays_with_explicit_sign() {
        assert_eq!(SignedDegrees::from(45.5).to_string(), "+45.5");
        assert_eq!(SignedDegrees::from(-45.5).to_string(), "-45.5");
    }
}
