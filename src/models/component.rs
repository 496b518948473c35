//! Component records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{null_as_default, ValidationError};

/// Health of a component as shown on the status page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ComponentStatus {
    Operational = 1,
    PerformanceIssues = 2,
    PartialOutage = 3,
    MajorOutage = 4,
}

impl TryFrom<u8> for ComponentStatus {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Operational),
            2 => Ok(Self::PerformanceIssues),
            3 => Ok(Self::PartialOutage),
            4 => Ok(Self::MajorOutage),
            _ => Err(ValidationError::StatusOutOfRange {
                kind: "component",
                value,
            }),
        }
    }
}

impl From<ComponentStatus> for u8 {
    fn from(status: ComponentStatus) -> Self {
        status as u8
    }
}

/// A component as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: i64,
    pub name: String,
    pub status: ComponentStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub group_id: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, with = "super::timestamp")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "super::timestamp")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default, with = "super::timestamp")]
    pub deleted_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub status_name: Option<String>,
    #[serde(default)]
    pub tags: Option<serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

/// Fields sent when creating or updating a component.
///
/// `name` and `group_id` together are the logical identity of a component;
/// the remote id takes over once the component exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDraft {
    pub name: String,
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub order: i32,
    pub group_id: i64,
    pub enabled: bool,
}

impl ComponentDraft {
    /// An enabled component at order 0 in the default group.
    pub fn new(name: impl Into<String>, status: ComponentStatus) -> Self {
        Self {
            name: name.into(),
            status,
            description: None,
            link: None,
            order: 0,
            group_id: 0,
            enabled: true,
        }
    }

    pub fn with_group(mut self, group_id: i64) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName("component"));
        }
        Ok(())
    }
}
