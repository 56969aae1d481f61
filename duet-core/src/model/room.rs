use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Room identifier restricted to `[A-Za-z0-9_-]`.
///
/// Built only through [`RoomId::parse`], so a value of this type is never
/// empty and is always safe to splice into a relay path.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let sanitized = sanitize_room_id(raw);
        if sanitized.is_empty() {
            return Err(CoreError::EmptyRoomId {
                raw: raw.to_owned(),
            });
        }
        Ok(Self(sanitized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Keeps the last path segment of `raw` (so a pasted room link works) and
/// drops every character outside `[A-Za-z0-9_-]`.
pub fn sanitize_room_id(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);

    last.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

impl TryFrom<String> for RoomId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
