//! Number of volumes of a comic series.
//!
//! On the wire the count is always a string of the form `"<N> Volumes"`,
//! in the database it is a plain integer.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

const UNIT: &str = "Volumes";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid format for field 'volumes'")]
pub struct InvalidFormatError;

/// Zero is the "not provided" value, see [`crate::validation`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Volumes(i32);

impl Volumes {
    pub const fn new(count: i32) -> Self {
        Volumes(count)
    }

    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for Volumes {
    fn from(value: i32) -> Self {
        Volumes(value)
    }
}

impl fmt::Display for Volumes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, UNIT)
    }
}

impl FromStr for Volumes {
    type Err = InvalidFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.split(' ').collect::<Vec<_>>();
        match parts.as_slice() {
            [count, unit] if *unit == UNIT => count
                .parse::<i32>()
                .map(Volumes)
                .map_err(|_| InvalidFormatError),
            _ => Err(InvalidFormatError),
        }
    }
}

impl Serialize for Volumes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct VolumesVisitor;

impl de::Visitor<'_> for VolumesVisitor {
    type Value = Volumes;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string like \"12 Volumes\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Volumes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(VolumesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(Volumes::new(12).to_string(), "12 Volumes");
        assert_eq!(Volumes::new(1).to_string(), "1 Volumes");
        assert_eq!(Volumes::new(1_000_000).to_string(), "1000000 Volumes");
    }

    #[test]
    fn test_round_trip() {
        for v in [1, 2, 9, 10, 99, 12_345, i32::MAX - 1, i32::MAX] {
            let decoded: Volumes = Volumes::new(v).to_string().parse().unwrap();
            assert_eq!(decoded.get(), v);
        }
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        for token in [
            "5",
            "5 volumes",
            "5 VOLUMES",
            "Volumes",
            "five Volumes",
            "5  Volumes",
            "5 Volumes extra",
            " 5 Volumes",
            "5.0 Volumes",
            "2147483648 Volumes",
            "",
        ] {
            assert_eq!(
                token.parse::<Volumes>(),
                Err(InvalidFormatError),
                "token {token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_decode_accepts_signed_count() {
        // sign is accepted by the codec, positivity is checked by validation
        assert_eq!("-3 Volumes".parse::<Volumes>(), Ok(Volumes::new(-3)));
        assert_eq!("+3 Volumes".parse::<Volumes>(), Ok(Volumes::new(3)));
    }

    #[test]
    fn test_json() {
        let json = serde_json::to_string(&Volumes::new(7)).unwrap();
        assert_eq!(json, r#""7 Volumes""#);

        let v: Volumes = serde_json::from_str(r#""42 Volumes""#).unwrap();
        assert_eq!(v, Volumes::new(42));

        assert!(serde_json::from_str::<Volumes>("42").is_err());
        assert!(serde_json::from_str::<Volumes>(r#""42""#).is_err());
        assert!(serde_json::from_str::<Volumes>(r#""42 volumes""#).is_err());
        assert!(serde_json::from_str::<Volumes>("null").is_err());
    }
}
