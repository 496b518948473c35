//! Find-or-create of the component behind a monitored target.

use serde::Serialize;

use super::ReconcileError;
use crate::client::StatusPageApi;
use crate::models::{Component, ComponentDraft};

/// What the resolver did to the remote component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentAction {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct ResolvedComponent {
    pub component: Component,
    pub action: ComponentAction,
}

pub struct ComponentResolver<'a> {
    client: &'a dyn StatusPageApi,
}

impl<'a> ComponentResolver<'a> {
    pub fn new(client: &'a dyn StatusPageApi) -> Self {
        Self { client }
    }

    /// Look up the component by name and group; create it when missing,
    /// update it when its status differs from the draft's (or always, with
    /// `update_if_same_status`).
    pub async fn resolve(
        &self,
        draft: &ComponentDraft,
        update_if_same_status: bool,
    ) -> Result<ResolvedComponent, ReconcileError> {
        draft.validate()?;

        let existing = self
            .client
            .get_component_by_name_and_group(&draft.name, draft.group_id)
            .await?;

        let Some(existing) = existing else {
            let component = self
                .client
                .create_component(draft)
                .await?
                .ok_or_else(|| ReconcileError::Rejected {
                    operation: "create component",
                    name: draft.name.clone(),
                })?;
            tracing::info!(
                "Created component {} (id {}, group {}) with status {:?}",
                component.name,
                component.id,
                component.group_id,
                component.status
            );
            return Ok(ResolvedComponent {
                component,
                action: ComponentAction::Created,
            });
        };

        if existing.status == draft.status && !update_if_same_status {
            tracing::debug!(
                "Component {} (id {}) already {:?}, skipping update",
                existing.name,
                existing.id,
                existing.status
            );
            return Ok(ResolvedComponent {
                component: existing,
                action: ComponentAction::Unchanged,
            });
        }

        let component = self
            .client
            .update_component(existing.id, draft)
            .await?
            .ok_or_else(|| ReconcileError::Rejected {
                operation: "update component",
                name: draft.name.clone(),
            })?;
        tracing::info!(
            "Updated component {} (id {}): {:?} -> {:?}",
            component.name,
            component.id,
            existing.status,
            component.status
        );
        Ok(ResolvedComponent {
            component,
            action: ComponentAction::Updated,
        })
    }
}
