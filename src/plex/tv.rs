//! HTTP client for the plex.tv account API.
//!
//! Handles the PIN link flow and per-request token checks. Unlike
//! [`PlexServer`](crate::plex::PlexServer) this client holds no credential of
//! its own; user tokens are passed per call.

use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::plex::types::{LoginPin, PlexAccount};

const PLEX_TV_BASE: &str = "https://plex.tv/api/v2";
const PLEX_PRODUCT: &str = "plexclip";

/// Timeout for plex.tv API requests.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PlexTv {
    client: Client,
    base_url: String,
    client_identifier: String,
}

impl PlexTv {
    pub fn new(client_identifier: impl Into<String>) -> Self {
        Self::with_base_url(PLEX_TV_BASE, client_identifier)
    }

    /// Point the client at a different endpoint, e.g. a relay or a test
    /// double.
    pub fn with_base_url(base_url: impl Into<String>, client_identifier: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_identifier: client_identifier.into(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(header::ACCEPT, "application/json")
            .header("X-Plex-Product", PLEX_PRODUCT)
            .header("X-Plex-Client-Identifier", &self.client_identifier)
    }

    /// Request a new link PIN. The user enters its code at plex.tv/link.
    pub async fn create_pin(&self) -> Result<LoginPin> {
        let response = self
            .request(reqwest::Method::POST, "/pins")
            .query(&[("strong", "false")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "pin creation returned {}",
                response.status()
            )));
        }

        let pin: PinDto = response.json().await?;
        Ok(LoginPin {
            id: pin.id,
            code: pin.code,
            expires_in: pin.expires_in,
        })
    }

    /// Poll a PIN for its claimed token. `None` until the user links it.
    pub async fn claim_pin(&self, pin_id: i64) -> Result<Option<String>> {
        let response = self
            .request(reqwest::Method::GET, &format!("/pins/{pin_id}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(Error::not_found("pin", pin_id)),
            status if !status.is_success() => {
                return Err(Error::upstream(format!("pin poll returned {status}")));
            }
            _ => {}
        }

        let pin: PinDto = response.json().await?;
        Ok(pin.auth_token.filter(|t| !t.is_empty()))
    }

    /// Look up the account a token belongs to.
    pub async fn account(&self, token: &str) -> Result<PlexAccount> {
        let response = self
            .request(reqwest::Method::GET, "/user")
            .header("X-Plex-Token", token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                return Err(Error::Unauthorized("plex.tv rejected the token".to_string()));
            }
            status if !status.is_success() => {
                return Err(Error::upstream(format!("account lookup returned {status}")));
            }
            _ => {}
        }

        let user: UserDto = response.json().await?;
        Ok(PlexAccount {
            id: user.id,
            uuid: user.uuid.unwrap_or_default(),
            username: user.username.unwrap_or_default(),
            title: user.title.unwrap_or_default(),
            email: user.email,
            thumb: user.thumb,
        })
    }

    /// Whether a token can reach the server with the given machine
    /// identifier, i.e. the account owns it or has it shared.
    pub async fn can_access_server(&self, token: &str, machine_id: &str) -> Result<bool> {
        let response = self
            .request(reqwest::Method::GET, "/resources")
            .header("X-Plex-Token", token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                return Err(Error::Unauthorized("plex.tv rejected the token".to_string()));
            }
            status if !status.is_success() => {
                return Err(Error::upstream(format!("resource list returned {status}")));
            }
            _ => {}
        }

        let resources: Vec<ResourceDto> = response.json().await?;
        Ok(has_server_access(&resources, machine_id))
    }
}

fn has_server_access(resources: &[ResourceDto], machine_id: &str) -> bool {
    resources.iter().any(|r| {
        r.provides.as_deref().unwrap_or_default().contains("server")
            && r.client_identifier.as_deref() == Some(machine_id)
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinDto {
    id: i64,
    code: String,
    expires_in: Option<i64>,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserDto {
    id: i64,
    uuid: Option<String>,
    username: Option<String>,
    title: Option<String>,
    email: Option<String>,
    thumb: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceDto {
    client_identifier: Option<String>,
    provides: Option<String>,
    #[allow(dead_code)]
    owned: Option<bool>,
}
