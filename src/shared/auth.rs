use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::{AzaError, Result};

const TOKEN_RESOURCE: &str = "https://ai.azure.com";
/// Tokens are refreshed this long before the reported expiry.
const REFRESH_MARGIN_SECS: i64 = 300;
/// Used when the Azure CLI does not report an expiry.
const FALLBACK_LIFETIME_SECS: i64 = 600;

#[derive(Debug, Clone, PartialEq)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Source of bearer tokens for the agent service.
#[derive(Clone)]
pub enum Credential {
    Static(String),
    AzureCli(Arc<Mutex<Option<CachedToken>>>),
}

impl Credential {
    /// An explicit token wins; otherwise tokens come from `az account get-access-token`.
    pub fn from_token(token: Option<String>) -> Self {
        match token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            Some(token) => Credential::Static(token),
            None => Credential::AzureCli(Arc::new(Mutex::new(None))),
        }
    }

    pub async fn bearer(&self) -> Result<String> {
        match self {
            Credential::Static(token) => Ok(token.clone()),
            Credential::AzureCli(cache) => {
                let mut guard = cache.lock().await;
                if let Some(cached) = guard.as_ref().filter(|c| c.is_fresh(Utc::now())) {
                    return Ok(cached.token.clone());
                }
                let fresh = fetch_cli_token().await?;
                let token = fresh.token.clone();
                *guard = Some(fresh);
                Ok(token)
            }
        }
    }
}

#[derive(Deserialize)]
struct CliTokenOutput {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(default)]
    expires_on: Option<i64>,
}

async fn fetch_cli_token() -> Result<CachedToken> {
    debug!("requesting access token from Azure CLI");
    let output = Command::new("az")
        .args([
            "account",
            "get-access-token",
            "--resource",
            TOKEN_RESOURCE,
            "--output",
            "json",
        ])
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AzaError::usage(
                "Azure CLI (az) not found; set AZA_TOKEN or install az and run `az login`",
            ),
            _ => AzaError::Io(e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AzaError::usage(format!(
            "az account get-access-token failed: {}",
            stderr.trim()
        )));
    }

    parse_cli_token(&String::from_utf8_lossy(&output.stdout), Utc::now())
}

pub fn parse_cli_token(raw: &str, now: DateTime<Utc>) -> Result<CachedToken> {
    let parsed: CliTokenOutput = serde_json::from_str(raw)?;
    let expires_at = parsed
        .expires_on
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(|| now + Duration::seconds(FALLBACK_LIFETIME_SECS));
    Ok(CachedToken {
        token: parsed.access_token,
        expires_at,
    })
}
