//! Data model: members, edges and the member record codec.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DecodeError, ResolveError};

/// Predicate linking a member (subject) to a group (object).
pub const FOLLOWS: &str = "follows";

/// Version byte prepended to every encoded member record.
pub const MEMBER_RECORD_VERSION: u8 = 1;

/// A group member as returned by the remote API.
///
/// Fields that are missing or `null` decode as their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Member {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(deserialize_with = "null_as_default")]
    pub hometown: String,
    /// Join timestamp (epoch milliseconds)
    #[serde(deserialize_with = "null_as_default")]
    pub joined: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub lon: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub lat: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub visited: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
}

impl Member {
    /// Create a member with only id and name set.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Canonical cache key / graph subject for this member.
    pub fn key(&self) -> String {
        member_key(self.id)
    }

    /// Encode as a versioned member record.
    pub fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        let mut buf = Vec::with_capacity(256);
        buf.push(MEMBER_RECORD_VERSION);
        serde_json::to_writer(&mut buf, self)?;
        Ok(buf)
    }

    /// Decode a versioned member record.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let (version, body) = data.split_first().ok_or(DecodeError::Empty)?;
        if *version != MEMBER_RECORD_VERSION {
            return Err(DecodeError::UnsupportedVersion(*version));
        }
        Ok(serde_json::from_slice(body)?)
    }
}

/// Deserialize a field, mapping JSON `null` to the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Canonical decimal encoding of a member id.
pub fn member_key(id: i64) -> String {
    id.to_string()
}

/// Canonicalise a textual member id (e.g. a graph subject) into its cache key.
///
/// `" 007"` and `"7"` map to the same key.
pub fn canonical_member_key(raw: &str) -> Result<String, ResolveError> {
    raw.trim()
        .parse::<i64>()
        .map(member_key)
        .map_err(|_| ResolveError::InvalidMemberId(raw.to_string()))
}

/// A directed, labeled relation `subject --predicate--> object`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Edge {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// `member --follows--> group`
    pub fn follows(member: &Member, group: impl Into<String>) -> Self {
        Self::new(member.key(), FOLLOWS, group)
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} -> {}", self.subject, self.predicate, self.object)
    }
}
