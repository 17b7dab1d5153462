//! Clients for the systems mvirt-switch talks to.
//!
//! - Home Assistant: desired power flags (input_booleans)
//! - qm: actual VM state and power actions on the local Proxmox host
//! - healthcheck: liveness ping after each successful cycle
//!
//! The agent only sees the traits below, so tests can swap in fakes.

pub mod healthcheck;
pub mod home_assistant;
pub mod qm;

use async_trait::async_trait;

use crate::error::{ActuationError, ProviderError};
use crate::model::{ActualState, DesiredState, Directive};

pub use healthcheck::HealthcheckClient;
pub use home_assistant::HomeAssistantClient;
pub use qm::QmClient;

/// Source of the desired power state.
#[async_trait]
pub trait DesiredStateProvider: Send + Sync {
    async fn fetch(&self) -> Result<DesiredState, ProviderError>;
}

/// Source of the actual VM state.
#[async_trait]
pub trait ActualStateProvider: Send + Sync {
    async fn fetch(&self) -> Result<ActualState, ProviderError>;
}

/// Applies one directive to the hypervisor. Does not retry.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn apply(&self, directive: &Directive) -> Result<(), ActuationError>;
}

/// External watchdog notified after a successful cycle.
#[async_trait]
pub trait LivenessReporter: Send + Sync {
    async fn report(&self) -> anyhow::Result<()>;
}
