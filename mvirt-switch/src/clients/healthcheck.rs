//! Healthcheck ping (healthchecks.io style).

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::debug;

use super::LivenessReporter;
use crate::error::ConfigError;

pub struct HealthcheckClient {
    http: reqwest::Client,
    url: String,
}

impl HealthcheckClient {
    pub fn new(url: String, timeout: Option<std::time::Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ConfigError::HttpClient)?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn ping(&self) -> Result<()> {
        debug!("Pinging healthcheck {}", self.url);
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to ping {}", self.url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Healthcheck {} returned {}",
                self.url,
                response.status()
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LivenessReporter for HealthcheckClient {
    async fn report(&self) -> Result<()> {
        self.ping().await
    }
}
