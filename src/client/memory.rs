//! In-memory status page for testing.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::StatusCode;

use super::{ClientError, StatusPageApi};
use crate::models::{Component, ComponentDraft, Incident, IncidentDraft};

/// A write issued against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    CreateComponent(String),
    UpdateComponent(i64),
    DeleteComponent(i64),
    CreateIncident(i64),
    UpdateIncident(i64),
    DeleteIncident(i64),
}

#[derive(Default)]
struct State {
    components: Vec<Component>,
    incidents: Vec<Incident>,
    next_id: i64,
    writes: Vec<Write>,
    failing: HashSet<String>,
    stalled: HashSet<String>,
    pause_lookups: bool,
    now: Option<NaiveDateTime>,
}

/// Status page held in memory. Records writes, stamps `created_at` with a
/// settable clock and can fail every call touching a given component name.
/// Lookups can be made to yield to the scheduler or to never return.
pub struct InMemoryStatusPage {
    state: Mutex<State>,
    fail_fast: bool,
}

impl InMemoryStatusPage {
    /// Lenient fake: failures degrade to empty results.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            fail_fast: false,
        }
    }

    /// Strict fake: failures are returned as errors.
    pub fn strict() -> Self {
        Self {
            fail_fast: true,
            ..Self::new()
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_now(&self, now: NaiveDateTime) {
        self.state().now = Some(now);
    }

    /// Make every call for components named `name` fail.
    pub fn fail_for(&self, name: &str) {
        self.state().failing.insert(name.to_string());
    }

    /// Make lookups of components named `name` hang forever.
    pub fn stall_for(&self, name: &str) {
        self.state().stalled.insert(name.to_string());
    }

    /// Yield to the scheduler after every list call, so concurrent units
    /// interleave between lookup and write like they do over the network.
    pub fn pause_after_lookups(&self) {
        self.state().pause_lookups = true;
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    pub fn components(&self) -> Vec<Component> {
        self.state().components.clone()
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.state().incidents.clone()
    }

    /// Seed an incident directly, bypassing the write log.
    pub fn insert_incident(&self, incident: Incident) {
        let mut state = self.state();
        state.next_id = state.next_id.max(incident.id);
        state.incidents.push(incident);
    }

    fn failure<T>(&self, fallback: T) -> Result<T, ClientError> {
        if self.fail_fast {
            Err(ClientError::Status {
                method: "GET",
                url: "memory://".to_string(),
                status: StatusCode::SERVICE_UNAVAILABLE,
            })
        } else {
            Ok(fallback)
        }
    }

    fn component_name(state: &State, id: i64) -> Option<String> {
        state
            .components
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
    }

    fn is_failing(state: &State, name: Option<&str>) -> bool {
        name.map(|n| state.failing.contains(n)).unwrap_or(false)
    }

    fn find_components(&self, state: &State, name: &str) -> Result<Vec<Component>, ClientError> {
        if state.failing.contains(name) {
            return self.failure(Vec::new());
        }
        let mut found: Vec<Component> = state
            .components
            .iter()
            .filter(|c| c.name.contains(name))
            .cloned()
            .collect();
        newest_first(&mut found, |c| (c.created_at, c.id));
        Ok(found)
    }

    fn find_incidents(&self, state: &State, component_id: i64) -> Result<Vec<Incident>, ClientError> {
        if Self::is_failing(state, Self::component_name(state, component_id).as_deref()) {
            return self.failure(Vec::new());
        }
        let mut found: Vec<Incident> = state
            .incidents
            .iter()
            .filter(|i| i.component_id == component_id)
            .cloned()
            .collect();
        newest_first(&mut found, |i| (i.created_at, i.id));
        Ok(found)
    }
}

impl Default for InMemoryStatusPage {
    fn default() -> Self {
        Self::new()
    }
}

/// Newest first, like the API's `sort=created_at&order=desc`.
fn newest_first<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> (Option<NaiveDateTime>, i64),
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl StatusPageApi for InMemoryStatusPage {
    async fn get_component(&self, id: i64) -> Result<Option<Component>, ClientError> {
        let state = self.state();
        if Self::is_failing(&state, Self::component_name(&state, id).as_deref()) {
            return self.failure(None);
        }
        Ok(state.components.iter().find(|c| c.id == id).cloned())
    }

    async fn list_components(&self, name: &str) -> Result<Vec<Component>, ClientError> {
        let (stalled, pause, result) = {
            let state = self.state();
            (
                state.stalled.contains(name),
                state.pause_lookups,
                self.find_components(&state, name),
            )
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        if pause {
            tokio::task::yield_now().await;
        }
        result
    }

    async fn create_component(&self, draft: &ComponentDraft) -> Result<Option<Component>, ClientError> {
        draft.validate()?;
        let mut state = self.state();
        if state.failing.contains(&draft.name) {
            return self.failure(None);
        }
        state.next_id += 1;
        let component = Component {
            id: state.next_id,
            name: draft.name.clone(),
            status: draft.status,
            description: draft.description.clone(),
            link: draft.link.clone(),
            order: draft.order,
            group_id: draft.group_id,
            enabled: draft.enabled,
            created_at: state.now,
            updated_at: state.now,
            deleted_at: None,
            status_name: None,
            tags: None,
        };
        state.components.push(component.clone());
        state.writes.push(Write::CreateComponent(draft.name.clone()));
        Ok(Some(component))
    }

    async fn update_component(
        &self,
        id: i64,
        draft: &ComponentDraft,
    ) -> Result<Option<Component>, ClientError> {
        draft.validate()?;
        let mut state = self.state();
        if state.failing.contains(&draft.name) {
            return self.failure(None);
        }
        let now = state.now;
        state.writes.push(Write::UpdateComponent(id));
        let Some(component) = state.components.iter_mut().find(|c| c.id == id) else {
            return self.failure(None);
        };
        component.name = draft.name.clone();
        component.status = draft.status;
        component.description = draft.description.clone();
        component.link = draft.link.clone();
        component.order = draft.order;
        component.group_id = draft.group_id;
        component.enabled = draft.enabled;
        component.updated_at = now;
        Ok(Some(component.clone()))
    }

    async fn delete_component(&self, id: i64) -> Result<bool, ClientError> {
        let mut state = self.state();
        state.writes.push(Write::DeleteComponent(id));
        let before = state.components.len();
        state.components.retain(|c| c.id != id);
        Ok(state.components.len() < before)
    }

    async fn get_incident(&self, id: i64) -> Result<Option<Incident>, ClientError> {
        Ok(self.state().incidents.iter().find(|i| i.id == id).cloned())
    }

    async fn list_incidents(&self, component_id: i64) -> Result<Vec<Incident>, ClientError> {
        let (pause, result) = {
            let state = self.state();
            (state.pause_lookups, self.find_incidents(&state, component_id))
        };
        if pause {
            tokio::task::yield_now().await;
        }
        result
    }

    async fn create_incident(&self, draft: &IncidentDraft) -> Result<Option<Incident>, ClientError> {
        draft.validate()?;
        let mut state = self.state();
        if Self::is_failing(&state, Self::component_name(&state, draft.component_id).as_deref()) {
            return self.failure(None);
        }
        state.next_id += 1;
        let created_at = draft.created_at.or(state.now);
        let incident = Incident {
            id: state.next_id,
            name: draft.name.clone(),
            message: draft.message.clone(),
            status: draft.status,
            visible: draft.visible,
            component_id: draft.component_id,
            component_status: Some(draft.component_status),
            notify: draft.notify,
            created_at,
            updated_at: created_at,
            deleted_at: None,
            scheduled_at: None,
            human_status: None,
            template: draft.template.clone(),
            vars: draft.vars.clone(),
        };
        state.incidents.push(incident.clone());
        state.writes.push(Write::CreateIncident(draft.component_id));
        Ok(Some(incident))
    }

    async fn update_incident(
        &self,
        id: i64,
        draft: &IncidentDraft,
    ) -> Result<Option<Incident>, ClientError> {
        draft.validate()?;
        let mut state = self.state();
        if Self::is_failing(&state, Self::component_name(&state, draft.component_id).as_deref()) {
            return self.failure(None);
        }
        let now = state.now;
        state.writes.push(Write::UpdateIncident(id));
        let Some(incident) = state.incidents.iter_mut().find(|i| i.id == id) else {
            return self.failure(None);
        };
        incident.name = draft.name.clone();
        incident.message = draft.message.clone();
        incident.status = draft.status;
        incident.visible = draft.visible;
        incident.component_id = draft.component_id;
        incident.component_status = Some(draft.component_status);
        incident.notify = draft.notify;
        incident.updated_at = now;
        Ok(Some(incident.clone()))
    }

    async fn delete_incident(&self, id: i64) -> Result<bool, ClientError> {
        let mut state = self.state();
        state.writes.push(Write::DeleteIncident(id));
        let before = state.incidents.len();
        state.incidents.retain(|i| i.id != id);
        Ok(state.incidents.len() < before)
    }
}
