use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Canonical identifier for contacts and groups
///
/// The record-storage API hands out ids as JSON numbers on some paths and as
/// strings on others (and the admin console posts back whatever it was
/// given). Every id entering the crate goes through [`RecordId::normalize`]
/// so that `"42"`, `" 42 "`, `42` and `42.0` all compare equal.
///
/// Finite integral values become [`RecordId::Int`]. Finite non-integral
/// values keep their shortest decimal rendering as [`RecordId::Text`], so
/// `"1.50"` and `1.5` still collide. Anything that is not a finite number is
/// kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

/// Contact identifier
pub type ContactId = RecordId;

/// Group identifier
pub type GroupId = RecordId;

/// A membership set, always held in canonical form
pub type IdSet = BTreeSet<RecordId>;

impl RecordId {
    /// Canonicalize a textual id
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return RecordId::Text(raw.to_string());
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return RecordId::Int(i);
        }
        if let Ok(u) = trimmed.parse::<u64>() {
            return RecordId::from(u);
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && looks_numeric(trimmed) => Self::from_f64(n),
            _ => RecordId::Text(raw.to_string()),
        }
    }

    /// Canonicalize a numeric id
    pub fn from_f64(n: f64) -> Self {
        if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
            // -0.0 casts to 0
            RecordId::Int(n as i64)
        } else {
            RecordId::Text(n.to_string())
        }
    }

    /// Canonicalize an arbitrary JSON scalar
    ///
    /// Returns `None` for arrays, objects and null.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(RecordId::Int(i))
                } else {
                    n.as_f64().map(Self::from_f64)
                }
            }
            serde_json::Value::String(s) => Some(Self::normalize(s)),
            serde_json::Value::Bool(b) => Some(RecordId::Text(b.to_string())),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RecordId::Int(i) => Some(*i),
            RecordId::Text(_) => None,
        }
    }

    /// Path segment for REST URLs
    pub fn to_path_segment(&self) -> String {
        urlencoding::encode(&self.to_string()).into_owned()
    }
}

// `str::parse::<f64>` also accepts "inf", "NaN" and friends; those are
// filtered by `is_finite`, but words like "infinity" must not slip through
// as text-looking numbers either.
fn looks_numeric(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Int(value)
    }
}

impl From<i32> for RecordId {
    fn from(value: i32) -> Self {
        RecordId::Int(value as i64)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => RecordId::Int(i),
            Err(_) => RecordId::Text(value.to_string()),
        }
    }
}

impl From<f64> for RecordId {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            Self::from_f64(value)
        } else {
            RecordId::Text(value.to_string())
        }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::normalize(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::normalize(&value)
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::normalize(s))
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordId::Int(i) => serializer.serialize_i64(*i),
            RecordId::Text(s) => serializer.serialize_str(s),
        }
    }
}

struct RecordIdVisitor;

impl<'de> Visitor<'de> for RecordIdVisitor {
    type Value = RecordId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a numeric or string identifier")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RecordId, E> {
        Ok(RecordId::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RecordId, E> {
        Ok(RecordId::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RecordId, E> {
        Ok(RecordId::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RecordId, E> {
        Ok(RecordId::normalize(v))
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RecordIdVisitor)
    }
}

/// Normalize every element of an id collection into a set
pub fn normalize_all<I, T>(ids: I) -> IdSet
where
    I: IntoIterator<Item = T>,
    T: Into<RecordId>,
{
    ids.into_iter().map(Into::into).collect()
}
