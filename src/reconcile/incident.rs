//! Incident decisions for one check outcome.
//!
//! At most one incident per component per calendar day: later outcomes on
//! the same day update that day's incident in place.

use serde::Serialize;

use super::{Clock, ReconcileError, ReconcileOptions};
use crate::client::StatusPageApi;
use crate::models::{CheckOutcome, IncidentDraft};

/// Why no incident was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Valid outcome and no incident was ever reported for the component.
    NothingToReport,
    /// Newest incident already carries the computed status.
    StatusUnchanged,
}

/// What the reconciler did with the incident for this outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "detail")]
pub enum IncidentAction {
    Created(i64),
    Updated(i64),
    Skipped(SkipReason),
}

pub struct IncidentReconciler<'a> {
    client: &'a dyn StatusPageApi,
    clock: &'a dyn Clock,
}

impl<'a> IncidentReconciler<'a> {
    pub fn new(client: &'a dyn StatusPageApi, clock: &'a dyn Clock) -> Self {
        Self { client, clock }
    }

    pub async fn reconcile(
        &self,
        component_id: i64,
        outcome: &CheckOutcome,
        options: &ReconcileOptions,
    ) -> Result<IncidentAction, ReconcileError> {
        let status = outcome.incident_status();
        let message = if outcome.description.trim().is_empty() {
            outcome.incident_name()
        } else {
            outcome.description.clone()
        };
        let draft = IncidentDraft::new(outcome.incident_name(), message, status)
            .for_component(component_id, outcome.component_status())
            .with_notify(options.notify);
        draft.validate()?;

        // The component filter is advisory on some API versions.
        let incidents: Vec<_> = self
            .client
            .list_incidents(component_id)
            .await?
            .into_iter()
            .filter(|i| i.component_id == component_id)
            .collect();
        let existing_status = incidents.first().map(|i| i.status);

        if outcome.is_valid && existing_status.is_none() && !options.save_valid_incidents {
            tracing::debug!("No incident to report for {}", outcome.name);
            return Ok(IncidentAction::Skipped(SkipReason::NothingToReport));
        }

        if existing_status == Some(status) && !options.update_if_statuses_are_the_same {
            tracing::debug!(
                "Incident for {} already {:?}, skipping",
                outcome.name,
                status
            );
            return Ok(IncidentAction::Skipped(SkipReason::StatusUnchanged));
        }

        let today = self.clock.today();
        let todays = incidents
            .iter()
            .find(|i| i.created_at.map(|at| at.date()) == Some(today));

        match todays {
            Some(incident) => {
                let updated = self
                    .client
                    .update_incident(incident.id, &draft)
                    .await?
                    .ok_or_else(|| ReconcileError::Rejected {
                        operation: "update incident",
                        name: outcome.name.clone(),
                    })?;
                tracing::info!(
                    "Updated incident {} for {}: {:?}",
                    updated.id,
                    outcome.name,
                    status
                );
                Ok(IncidentAction::Updated(updated.id))
            }
            None => {
                let created = self
                    .client
                    .create_incident(&draft)
                    .await?
                    .ok_or_else(|| ReconcileError::Rejected {
                        operation: "create incident",
                        name: outcome.name.clone(),
                    })?;
                tracing::info!(
                    "Created incident {} for {}: {:?}",
                    created.id,
                    outcome.name,
                    status
                );
                Ok(IncidentAction::Created(created.id))
            }
        }
    }
}
