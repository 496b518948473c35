//! Incident records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{null_as_default, ComponentStatus, ValidationError};

/// Progress of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum IncidentStatus {
    Investigating = 1,
    Identified = 2,
    Watching = 3,
    Fixed = 4,
}

impl TryFrom<u8> for IncidentStatus {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Investigating),
            2 => Ok(Self::Identified),
            3 => Ok(Self::Watching),
            4 => Ok(Self::Fixed),
            _ => Err(ValidationError::StatusOutOfRange {
                kind: "incident",
                value,
            }),
        }
    }
}

impl From<IncidentStatus> for u8 {
    fn from(status: IncidentStatus) -> Self {
        status as u8
    }
}

/// An incident as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    pub status: IncidentStatus,
    #[serde(
        default = "default_visible",
        serialize_with = "visible_to_int",
        deserialize_with = "visible_from_wire"
    )]
    pub visible: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub component_id: i64,
    #[serde(default)]
    pub component_status: Option<ComponentStatus>,
    #[serde(default)]
    pub notify: bool,
    #[serde(default, with = "super::timestamp")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "super::timestamp")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default, with = "super::timestamp")]
    pub deleted_at: Option<NaiveDateTime>,
    #[serde(default, with = "super::timestamp")]
    pub scheduled_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub human_status: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vars: Vec<String>,
}

/// Fields sent when creating or updating an incident.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentDraft {
    pub name: String,
    pub message: String,
    pub status: IncidentStatus,
    #[serde(serialize_with = "visible_to_int")]
    pub visible: bool,
    pub component_id: i64,
    pub component_status: ComponentStatus,
    pub notify: bool,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "super::timestamp::serialize"
    )]
    pub created_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<String>,
}

impl IncidentDraft {
    /// A visible, non-notifying incident not yet tied to a component.
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        status: IncidentStatus,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            status,
            visible: true,
            component_id: 0,
            component_status: ComponentStatus::Operational,
            notify: false,
            created_at: None,
            template: None,
            vars: Vec::new(),
        }
    }

    pub fn for_component(mut self, component_id: i64, status: ComponentStatus) -> Self {
        self.component_id = component_id;
        self.component_status = status;
        self
    }

    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_template(mut self, template: impl Into<String>, vars: Vec<String>) -> Self {
        self.template = Some(template.into());
        self.vars = vars;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName("incident"));
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(())
    }
}

fn default_visible() -> bool {
    true
}

fn visible_to_int<S: Serializer>(visible: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*visible))
}

/// The API sends `visible` as 0/1; some versions send a bool.
fn visible_from_wire<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Flag(bool),
        Int(i64),
    }

    match Option::<Wire>::deserialize(deserializer)? {
        Some(Wire::Flag(flag)) => Ok(flag),
        Some(Wire::Int(0)) => Ok(false),
        Some(Wire::Int(1)) | None => Ok(true),
        Some(Wire::Int(other)) => Err(serde::de::Error::custom(format!(
            "visible flag must be 0 or 1, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EnvelopeCollection;

    #[test]
    fn test_decode_incident_collection() {
        let body = r#"{
            "meta": {"pagination": {"total": 2}},
            "data": [
                {
                    "id": 7,
                    "name": "API check is invalid",
                    "message": "timeout",
                    "status": 2,
                    "visible": 1,
                    "component_id": 12,
                    "component_status": 4,
                    "notify": false,
                    "created_at": "2016-05-02 08:00:00",
                    "human_status": "Identified"
                },
                {
                    "id": 3,
                    "name": "API check is valid",
                    "message": "ok",
                    "status": 4,
                    "visible": 0,
                    "component_id": 12,
                    "created_at": "2016-05-01 08:00:00",
                    "vars": null
                }
            ]
        }"#;
        let env: EnvelopeCollection<Incident> = serde_json::from_str(body).unwrap();
        assert_eq!(env.data.len(), 2);
        assert_eq!(env.data[0].status, IncidentStatus::Identified);
        assert_eq!(env.data[0].component_status, Some(ComponentStatus::MajorOutage));
        assert!(env.data[0].visible);
        assert!(!env.data[1].visible);
        assert!(env.data[1].vars.is_empty());
    }

    #[test]
    fn test_draft_wire_shape() {
        let draft = IncidentDraft::new("API check is invalid", "connection refused", IncidentStatus::Identified)
            .for_component(12, ComponentStatus::MajorOutage)
            .with_notify(true);
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["status"], 2);
        assert_eq!(json["visible"], 1);
        assert_eq!(json["component_id"], 12);
        assert_eq!(json["component_status"], 4);
        assert_eq!(json["notify"], true);
        assert!(json.get("created_at").is_none());
        assert!(json.get("template").is_none());
        assert!(json.get("vars").is_none());
    }

    #[test]
    fn test_draft_with_template_and_created_at() {
        let created = NaiveDateTime::parse_from_str("2016-05-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let draft = IncidentDraft::new("n", "m", IncidentStatus::Watching)
            .with_created_at(created)
            .with_template("outage", vec!["API".to_string()]);
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["created_at"], "2016-05-01 10:00:00");
        assert_eq!(json["template"], "outage");
        assert_eq!(json["vars"][0], "API");
    }

    #[test]
    fn test_draft_validation() {
        let blank_message = IncidentDraft::new("API check is invalid", " ", IncidentStatus::Identified);
        assert_eq!(blank_message.validate(), Err(ValidationError::EmptyMessage));

        let blank_name = IncidentDraft::new("", "down", IncidentStatus::Identified);
        assert_eq!(blank_name.validate(), Err(ValidationError::EmptyName("incident")));
    }
}
