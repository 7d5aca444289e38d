//! Stall inventory owned by the stall service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, StallId};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StallSize {
    Small,
    Medium,
    Large,
}

impl StallSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            StallSize::Small => "SMALL",
            StallSize::Medium => "MEDIUM",
            StallSize::Large => "LARGE",
        }
    }
}

impl std::fmt::Display for StallSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StallSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SMALL" => Ok(StallSize::Small),
            "MEDIUM" => Ok(StallSize::Medium),
            "LARGE" => Ok(StallSize::Large),
            _ => Err(format!("Invalid stall size: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StallStatus {
    Available,
    Reserved,
    Maintenance,
}

impl StallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StallStatus::Available => "AVAILABLE",
            StallStatus::Reserved => "RESERVED",
            StallStatus::Maintenance => "MAINTENANCE",
        }
    }
}

impl std::fmt::Display for StallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StallStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AVAILABLE" => Ok(StallStatus::Available),
            "RESERVED" => Ok(StallStatus::Reserved),
            "MAINTENANCE" => Ok(StallStatus::Maintenance),
            _ => Err(format!("Invalid stall status: {s}")),
        }
    }
}

/// A physical stall on the fair floor plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StallRecord {
    pub id: StallId,
    pub stall_code: String,
    pub name: String,
    pub size: StallSize,
    pub status: StallStatus,
    pub section: Option<String>,
    pub row: Option<i32>,
    pub column: Option<i32>,
    pub x_position: Option<f64>,
    pub y_position: Option<f64>,
    pub width: Option<f64>,
    pub length: Option<f64>,
    pub price_per_day: Money,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StallRecord {
    pub fn is_available(&self) -> bool {
        self.status == StallStatus::Available
    }
}

/// Conjunctive filter for stall listings. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StallFilter {
    pub status: Option<StallStatus>,
    pub size: Option<StallSize>,
    pub section: Option<String>,
}

impl StallFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: StallStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn size(mut self, size: StallSize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn matches(&self, stall: &StallRecord) -> bool {
        self.status.is_none_or(|s| stall.status == s)
            && self.size.is_none_or(|s| stall.size == s)
            && self
                .section
                .as_deref()
                .is_none_or(|s| stall.section.as_deref() == Some(s))
    }
}

#[async_trait]
pub trait StallStore: Send + Sync {
    /// Fails with `Conflict` if the stall code is taken.
    async fn insert_stall(&self, stall: StallRecord) -> Result<StallRecord>;

    async fn find_stall(&self, id: StallId) -> Result<Option<StallRecord>>;

    async fn find_stall_by_code(&self, code: &str) -> Result<Option<StallRecord>>;

    /// Stalls matching the filter, ordered by stall code.
    async fn list_stalls(&self, filter: StallFilter) -> Result<Vec<StallRecord>>;

    /// Overwrites every mutable column. Fails with `NotFound` if absent.
    async fn update_stall(&self, stall: StallRecord) -> Result<StallRecord>;

    async fn delete_stall(&self, id: StallId) -> Result<bool>;
}
