//! Check outcomes handed over by the check runner.

use serde::{Deserialize, Serialize};

use super::{ComponentStatus, IncidentStatus};

/// One target's result from a single evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Name of the monitored target; becomes the component name.
    pub name: String,
    /// Logical group of the target, mapped to a remote group id.
    #[serde(default)]
    pub group: Option<String>,
    pub is_valid: bool,
    #[serde(default)]
    pub description: String,
}

impl CheckOutcome {
    pub fn valid(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            is_valid: true,
            description: description.into(),
        }
    }

    pub fn invalid(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            ..Self::valid(name, description)
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn component_status(&self) -> ComponentStatus {
        if self.is_valid {
            ComponentStatus::Operational
        } else {
            ComponentStatus::MajorOutage
        }
    }

    pub fn incident_status(&self) -> IncidentStatus {
        if self.is_valid {
            IncidentStatus::Fixed
        } else {
            IncidentStatus::Identified
        }
    }

    pub fn incident_name(&self) -> String {
        format!(
            "{} check is {}",
            self.name,
            if self.is_valid { "valid" } else { "invalid" }
        )
    }
}

/// A batch of outcomes from one evaluation pass. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Iteration {
    #[serde(default)]
    pub ordinal: i64,
    pub results: Vec<CheckOutcome>,
}

impl Iteration {
    pub fn new(results: Vec<CheckOutcome>) -> Self {
        Self { ordinal: 0, results }
    }
}
