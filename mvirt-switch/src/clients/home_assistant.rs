//! Client for the Home Assistant REST API.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::DesiredStateProvider;
use crate::config::Config;
use crate::error::{ConfigError, ProviderError};
use crate::model::{DesiredPower, DesiredState};

/// Message returned by `GET /api/` on a healthy instance.
const API_RUNNING: &str = "API running.";

/// Entity state as returned by `GET /api/states`.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

/// Client for Home Assistant, holding the base URL and bearer token.
pub struct HomeAssistantClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    entity_prefix: String,
}

impl HomeAssistantClient {
    /// Build the client and check the API. Fails if Home Assistant is not
    /// reachable or does not report itself as running.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ConfigError::HttpClient)?;

        let client = Self {
            http,
            base_url: config.ha_url.trim_end_matches('/').to_string(),
            token: config.ha_token.clone(),
            entity_prefix: config.entity_prefix.clone(),
        };
        client.health_check().await?;
        Ok(client)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = self.api_url(path);
        debug!("calling-ha: GET {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|source| ProviderError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status { url, status });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| ProviderError::Payload { url, source })
    }

    /// Verify the API answers with "API running.".
    pub async fn health_check(&self) -> Result<(), ProviderError> {
        let status: ApiStatus = self.get("").await?;
        if status.message != API_RUNNING {
            return Err(ProviderError::Unhealthy {
                url: self.api_url(""),
                message: format!("unexpected message {:?}", status.message),
            });
        }
        Ok(())
    }

    /// All entity states.
    pub async fn states(&self) -> Result<Vec<EntityState>, ProviderError> {
        self.get("states").await
    }
}

#[async_trait]
impl DesiredStateProvider for HomeAssistantClient {
    async fn fetch(&self) -> Result<DesiredState, ProviderError> {
        let states = self.states().await?;
        Ok(desired_from_states(&self.entity_prefix, states))
    }
}

/// Keep entities under `prefix`, keyed by the remainder of their id.
pub fn desired_from_states(
    prefix: &str,
    states: impl IntoIterator<Item = EntityState>,
) -> DesiredState {
    states
        .into_iter()
        .filter_map(|entity| {
            let name = entity.entity_id.strip_prefix(prefix)?;
            if name.is_empty() {
                return None;
            }
            let power = DesiredPower::parse(&entity.state);
            if let DesiredPower::Unrecognized(value) = &power {
                debug!("{} has unrecognized state {:?}", entity.entity_id, value);
            }
            Some((name.to_string(), power))
        })
        .collect()
}
