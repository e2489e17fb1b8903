//! GitHub token resolution.
//!
//! Interactive modes exchange the runner's OIDC identity token for a scoped
//! app installation token. Review mode runs on the workflow's own token and
//! never exchanges.

use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::core::config::{ActionConfig, keys};
use crate::core::types::ModeName;
use crate::error::PrepareError;

pub const OIDC_AUDIENCE: &str = "claude-code-github-action";
pub const DEFAULT_EXCHANGE_URL: &str =
    "https://api.anthropic.com/api/github/github-app-token-exchange";

/// Source of an exchanged installation token.
pub trait TokenProvider {
    fn exchange(&self) -> Result<String>;
}

/// Pick the token for `mode`.
pub fn resolve_token(
    mode: ModeName,
    config: &ActionConfig,
    provider: &dyn TokenProvider,
) -> Result<String> {
    if mode == ModeName::Review {
        return config
            .non_empty(keys::DEFAULT_WORKFLOW_TOKEN)
            .map(str::to_string)
            .ok_or_else(|| {
                PrepareError::Config(format!(
                    "{} is required for {} mode",
                    keys::DEFAULT_WORKFLOW_TOKEN,
                    ModeName::Review
                ))
                .into()
            });
    }
    if let Some(token) = config.non_empty(keys::OVERRIDE_GITHUB_TOKEN) {
        info!("using provided GitHub token");
        return Ok(token.to_string());
    }
    provider.exchange().context("exchange OIDC token for app token")
}

/// OIDC-to-installation-token exchange over HTTP.
pub struct OidcTokenExchange {
    http: Client,
    request_url: String,
    request_token: String,
    exchange_url: String,
}

impl OidcTokenExchange {
    pub fn from_config(config: &ActionConfig) -> Result<Self> {
        let missing = |key: &str| {
            anyhow!("{key} is not set; grant the workflow `id-token: write` permission")
        };
        let request_url = config
            .non_empty(keys::ID_TOKEN_REQUEST_URL)
            .ok_or_else(|| missing(keys::ID_TOKEN_REQUEST_URL))?;
        let request_token = config
            .non_empty(keys::ID_TOKEN_REQUEST_TOKEN)
            .ok_or_else(|| missing(keys::ID_TOKEN_REQUEST_TOKEN))?;
        let http = Client::builder()
            .build()
            .context("failed to create token exchange client")?;
        Ok(Self {
            http,
            request_url: request_url.to_string(),
            request_token: request_token.to_string(),
            exchange_url: config
                .non_empty(keys::TOKEN_EXCHANGE_URL)
                .unwrap_or(DEFAULT_EXCHANGE_URL)
                .to_string(),
        })
    }

    fn id_token(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct IdToken {
            value: String,
        }
        let response = self
            .http
            .get(&self.request_url)
            .query(&[("audience", OIDC_AUDIENCE)])
            .header(AUTHORIZATION, format!("Bearer {}", self.request_token))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, "preflight")
            .send()
            .context("request OIDC token")?;
        let status = response.status();
        if !status.is_success() {
            bail!("OIDC token request failed with status {}", status.as_u16());
        }
        let parsed: IdToken = response.json().context("decode OIDC token response")?;
        Ok(parsed.value)
    }
}

impl TokenProvider for OidcTokenExchange {
    #[instrument(skip_all)]
    fn exchange(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct AppToken {
            token: String,
        }
        let id_token = self.id_token()?;
        let response = self
            .http
            .post(&self.exchange_url)
            .header(AUTHORIZATION, format!("Bearer {id_token}"))
            .header(USER_AGENT, "preflight")
            .send()
            .context("request app token exchange")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!(
                "app token exchange failed with status {}: {}",
                status.as_u16(),
                body.trim()
            );
        }
        let parsed: AppToken = response.json().context("decode app token response")?;
        info!("exchanged OIDC token for app token");
        Ok(parsed.token)
    }
}
