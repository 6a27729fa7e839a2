use std::path::PathBuf;

use reqwest::Client;

use crate::shared::retry::RetryPolicy;
use crate::shared::{AgentsClient, Credential};

pub const DEFAULT_DIST_DIR: &str = "./ui/dist";

#[derive(Clone)]
pub struct UiState {
    pub http: Client,
    pub credential: Credential,
    /// Used when a request carries no `?project=`.
    pub default_project: Option<String>,
    pub dist_dir: PathBuf,
    pub retry: RetryPolicy,
    pub debug: bool,
}

impl UiState {
    pub fn new(
        http: Client,
        credential: Credential,
        default_project: Option<String>,
        dist_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http,
            credential,
            default_project: default_project.filter(|p| !p.trim().is_empty()),
            dist_dir: dist_dir.into(),
            retry: RetryPolicy::default(),
            debug: false,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let http = AgentsClient::build_http()?;
        let credential = Credential::from_token(std::env::var("AZA_TOKEN").ok());
        let dist_dir =
            std::env::var("AZA_UI_DIST").unwrap_or_else(|_| DEFAULT_DIST_DIR.to_string());

        let mut state = Self::new(http, credential, std::env::var("AZA_PROJECT").ok(), dist_dir);
        state.debug = std::env::var("AZA_DEBUG")
            .map(|v| matches!(v.as_str(), "1" | "true"))
            .unwrap_or(false);
        Ok(state)
    }
}
