use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a stall.
///
/// Stalls are keyed by UUID so that ids can be minted before the row
/// reaches the database and shared with other services unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StallId(Uuid);

impl StallId {
    /// Creates a new random stall ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a stall ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for StallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StallId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for StallId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<StallId> for Uuid {
    fn from(id: StallId) -> Self {
        id.0
    }
}

/// Identifier of a registered user, assigned by the auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
