use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use reqwest::{header, Client, Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info};

use super::auth::Credential;
use super::error::{AzaError, Result};

pub const DEFAULT_API_VERSION: &str = "v1";
pub const V2_AGENT_API_VERSION: &str = "2025-11-15-preview";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Which generation of the agent service a route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiSurface {
    /// Assistants, threads, runs, files and vector stores.
    Classic,
    /// Agents, conversations and responses.
    Agents,
}

impl ApiSurface {
    pub fn default_version(self) -> &'static str {
        match self {
            ApiSurface::Classic => DEFAULT_API_VERSION,
            ApiSurface::Agents => V2_AGENT_API_VERSION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = AzaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(AzaError::usage(format!(
                "Invalid order '{other}' (expected asc or desc)"
            ))),
        }
    }
}

/// Standard cursor paging parameters accepted by every listing endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub order: Option<SortOrder>,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl ListParams {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(order) = self.order {
            query.push(("order".to_string(), order.to_string()));
        }
        if let Some(after) = self.after.as_ref().filter(|v| !v.is_empty()) {
            query.push(("after".to_string(), after.clone()));
        }
        if let Some(before) = self.before.as_ref().filter(|v| !v.is_empty()) {
            query.push(("before".to_string(), before.clone()));
        }
        query
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub project: String,
    pub api_version: Option<String>,
    pub debug: bool,
}

impl ClientConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            api_version: None,
            debug: false,
        }
    }

    pub fn with_api_version(mut self, api_version: Option<String>) -> Self {
        self.api_version = api_version.filter(|v| !v.trim().is_empty());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Authenticated client for one agent-service project endpoint.
#[derive(Clone)]
pub struct AgentsClient {
    http: Client,
    base_url: Url,
    api_version: Option<String>,
    credential: Credential,
    debug: bool,
}

impl AgentsClient {
    pub fn build_http() -> Result<Client> {
        Ok(Client::builder()
            .user_agent(concat!("aza/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?)
    }

    pub fn new(http: Client, config: &ClientConfig, credential: Credential) -> Result<Self> {
        let project = config.project.trim();
        if project.is_empty() {
            return Err(AzaError::usage("Project endpoint is empty"));
        }
        let base_url = Url::parse(project)
            .map_err(|e| AzaError::usage(format!("Invalid project endpoint '{project}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AzaError::usage(format!(
                "Project endpoint must be http(s): {project}"
            )));
        }

        Ok(Self {
            http,
            base_url,
            api_version: config.api_version.clone(),
            credential,
            debug: config.debug,
        })
    }

    pub fn api_version(&self, surface: ApiSurface) -> &str {
        self.api_version
            .as_deref()
            .unwrap_or_else(|| surface.default_version())
    }

    /// Resolve a resource path against the project endpoint, adding `api-version`.
    pub fn endpoint(
        &self,
        surface: ApiSurface,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)
            .map_err(|e| AzaError::usage(format!("Invalid request path '{path}': {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            if !query.iter().any(|(k, _)| k == "api-version") {
                pairs.append_pair("api-version", self.api_version(surface));
            }
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub async fn get(
        &self,
        surface: ApiSurface,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value> {
        self.request(Method::GET, surface, path, query, None).await
    }

    pub async fn post(&self, surface: ApiSurface, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, surface, path, &[], Some(body))
            .await
    }

    pub async fn delete(&self, surface: ApiSurface, path: &str) -> Result<Value> {
        self.request(Method::DELETE, surface, path, &[], None).await
    }

    pub async fn request(
        &self,
        method: Method,
        surface: ApiSurface,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.endpoint(surface, path, query)?;
        let token = self.credential.bearer().await?;

        debug!(%method, %url, "agent service request");
        let started = Instant::now();

        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .header(header::ACCEPT, "application/json")
            .bearer_auth(token);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if self.debug {
            info!(
                %method,
                %url,
                status = status.as_u16(),
                duration_ms = started.elapsed().as_millis() as u64,
                bytes = text.len(),
                "agent service response"
            );
        } else {
            debug!(%method, status = status.as_u16(), "agent service response");
        }

        if !status.is_success() {
            return Err(AzaError::upstream(status, error_message(status, &text)));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Best human-readable message for a failed call.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let line = match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    };

    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| {
            let candidates = [
                payload.pointer("/error/message"),
                payload.get("message"),
                payload.get("error"),
            ];
            candidates
                .into_iter()
                .flatten()
                .find_map(|v| v.as_str().map(str::to_string))
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });

    match detail {
        Some(detail) => format!("{line}: {detail}"),
        None => line,
    }
}
