//! Remote resource client for the status page API.
//!
//! Every call is a fresh round trip; nothing is cached. A missing record is
//! `Ok(None)`, never an error. Whether a failed request is an error or an
//! empty result depends on strict mode, see [`crate::config::Connection`].

mod http;
#[cfg(test)]
pub mod memory;

pub use http::*;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::{Component, ComponentDraft, Incident, IncidentDraft, ValidationError};

/// Client error types.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{method} {url} failed: {source}")]
    Request {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} returned {status}")]
    Status {
        method: &'static str,
        url: String,
        status: StatusCode,
    },
    #[error("invalid response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Typed CRUD against the component and incident collections.
///
/// Lists are sorted newest first.
#[async_trait]
pub trait StatusPageApi: Send + Sync {
    async fn get_component(&self, id: i64) -> Result<Option<Component>, ClientError>;

    async fn list_components(&self, name: &str) -> Result<Vec<Component>, ClientError>;

    /// First component with exactly this name in this group.
    async fn get_component_by_name_and_group(
        &self,
        name: &str,
        group_id: i64,
    ) -> Result<Option<Component>, ClientError> {
        let components = self.list_components(name).await?;
        Ok(components
            .into_iter()
            .find(|c| c.name == name && c.group_id == group_id))
    }

    async fn create_component(&self, draft: &ComponentDraft) -> Result<Option<Component>, ClientError>;

    async fn update_component(
        &self,
        id: i64,
        draft: &ComponentDraft,
    ) -> Result<Option<Component>, ClientError>;

    async fn delete_component(&self, id: i64) -> Result<bool, ClientError>;

    async fn get_incident(&self, id: i64) -> Result<Option<Incident>, ClientError>;

    async fn list_incidents(&self, component_id: i64) -> Result<Vec<Incident>, ClientError>;

    async fn create_incident(&self, draft: &IncidentDraft) -> Result<Option<Incident>, ClientError>;

    async fn update_incident(
        &self,
        id: i64,
        draft: &IncidentDraft,
    ) -> Result<Option<Incident>, ClientError>;

    async fn delete_incident(&self, id: i64) -> Result<bool, ClientError>;
}
