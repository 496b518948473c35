//! HTTP implementation of [`StatusPageApi`] for the Cachet API.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ClientError, StatusPageApi};
use crate::config::{ConfigError, Connection, Credentials, ACCESS_TOKEN_HEADER};
use crate::models::{Component, ComponentDraft, Envelope, Incident, IncidentDraft};

const COMPONENTS: &str = "components";
const INCIDENTS: &str = "incidents";
const PAGE_SIZE: &str = "1000";

/// Client for one Cachet instance. Cheap to share; safe for concurrent use.
pub struct CachetClient {
    base_url: String,
    http: Client,
    fail_fast: bool,
}

impl CachetClient {
    /// Build a client sending the configured auth and extra headers on
    /// every request.
    pub fn new(connection: &Connection) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();

        match &connection.credentials {
            Credentials::Token(token) => {
                headers.insert(ACCESS_TOKEN_HEADER, sensitive_value(ACCESS_TOKEN_HEADER, token)?);
            }
            Credentials::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                headers.insert(
                    AUTHORIZATION,
                    sensitive_value("Authorization", &format!("Basic {}", encoded))?,
                );
            }
        }

        for (name, value) in &connection.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = connection.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: connection.api_url.clone(),
            http,
            fail_fast: connection.fail_fast,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request. Non-success responses and network errors are `None`
    /// in lenient mode and errors in strict mode, except a GET answered
    /// with 404 which is always `None`.
    async fn send(
        &self,
        method: &'static str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Option<Response>, ClientError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => {
                if self.fail_fast {
                    return Err(ClientError::Request {
                        method,
                        url: url.to_string(),
                        source,
                    });
                }
                tracing::warn!("Cachet: {} {} failed: {}", method, url, source);
                return Ok(None);
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(Some(response));
        }
        if method == "GET" && status == StatusCode::NOT_FOUND {
            tracing::debug!("Cachet: {} not found", url);
            return Ok(None);
        }
        if self.fail_fast {
            return Err(ClientError::Status {
                method,
                url: url.to_string(),
                status,
            });
        }
        tracing::warn!("Cachet: {} {} returned {}", method, url, status);
        Ok(None)
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        url: &str,
        response: Response,
    ) -> Result<Option<T>, ClientError> {
        match response.json::<Envelope<T>>().await {
            Ok(envelope) => Ok(Some(envelope.data)),
            Err(e) if self.fail_fast => Err(ClientError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(e) => {
                tracing::warn!("Cachet: could not decode response from {}: {}", url, e);
                Ok(None)
            }
        }
    }

    async fn fetch_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ClientError> {
        let url = self.url(path);
        match self.send("GET", &url, self.http.get(&url)).await? {
            Some(response) => self.decode(&url, response).await,
            None => Ok(None),
        }
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ClientError> {
        let url = self.url(path);
        let request = self.http.get(&url).query(query);
        match self.send("GET", &url, request).await? {
            Some(response) => Ok(self.decode::<Vec<T>>(&url, response).await?.unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        match self.send("POST", &url, self.http.post(&url).json(body)).await? {
            Some(response) => self.decode(&url, response).await,
            None => Ok(None),
        }
    }

    async fn put<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        match self.send("PUT", &url, self.http.put(&url).json(body)).await? {
            Some(response) => self.decode(&url, response).await,
            None => Ok(None),
        }
    }

    async fn delete(&self, path: &str) -> Result<bool, ClientError> {
        let url = self.url(path);
        Ok(self.send("DELETE", &url, self.http.delete(&url)).await?.is_some())
    }
}

fn sensitive_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    let mut header = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    header.set_sensitive(true);
    Ok(header)
}

#[async_trait]
impl StatusPageApi for CachetClient {
    async fn get_component(&self, id: i64) -> Result<Option<Component>, ClientError> {
        self.fetch_one(&format!("{}/{}", COMPONENTS, id)).await
    }

    async fn list_components(&self, name: &str) -> Result<Vec<Component>, ClientError> {
        self.fetch_list(
            COMPONENTS,
            &[
                ("name", name),
                ("sort", "created_at"),
                ("order", "desc"),
                ("per_page", PAGE_SIZE),
            ],
        )
        .await
    }

    async fn create_component(&self, draft: &ComponentDraft) -> Result<Option<Component>, ClientError> {
        draft.validate()?;
        self.post(COMPONENTS, draft).await
    }

    async fn update_component(
        &self,
        id: i64,
        draft: &ComponentDraft,
    ) -> Result<Option<Component>, ClientError> {
        draft.validate()?;
        self.put(&format!("{}/{}", COMPONENTS, id), draft).await
    }

    async fn delete_component(&self, id: i64) -> Result<bool, ClientError> {
        self.delete(&format!("{}/{}", COMPONENTS, id)).await
    }

    async fn get_incident(&self, id: i64) -> Result<Option<Incident>, ClientError> {
        self.fetch_one(&format!("{}/{}", INCIDENTS, id)).await
    }

    async fn list_incidents(&self, component_id: i64) -> Result<Vec<Incident>, ClientError> {
        let id = component_id.to_string();
        self.fetch_list(
            INCIDENTS,
            &[
                ("component_Id", id.as_str()),
                ("sort", "created_at"),
                ("order", "desc"),
                ("per_page", PAGE_SIZE),
            ],
        )
        .await
    }

    async fn create_incident(&self, draft: &IncidentDraft) -> Result<Option<Incident>, ClientError> {
        draft.validate()?;
        self.post(INCIDENTS, draft).await
    }

    async fn update_incident(
        &self,
        id: i64,
        draft: &IncidentDraft,
    ) -> Result<Option<Incident>, ClientError> {
        draft.validate()?;
        self.put(&format!("{}/{}", INCIDENTS, id), draft).await
    }

    async fn delete_incident(&self, id: i64) -> Result<bool, ClientError> {
        self.delete(&format!("{}/{}", INCIDENTS, id)).await
    }
}
