//! Dispatch gateway — the boundary to the external UI-automation collaborator.
//!
//! The core only needs one capability: deliver a prompt to whatever endpoint
//! is bound to a role and hand back the completed response text. The
//! transport is an opaque remote call that may suspend until completion or
//! timeout; how the collaborator drives a participant's interface is its own
//! business.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::role::ParticipantRole;

/// Default bound on waiting for a participant's response.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Errors from prompt dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No endpoint is bound to the role.
    #[error("role {0} has no bound endpoint")]
    NotBound(ParticipantRole),
    /// The transport errored or the collaborator reported failure.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
    /// No stable response arrived within the bounded waiting period.
    #[error("timed out waiting for response")]
    Timeout,
}

/// Delivery of prompts to role-bound endpoints.
#[async_trait]
pub trait DispatchGateway: Send + Sync {
    /// Deliver `prompt` to the endpoint bound to `role` and return the
    /// participant's completed response text.
    async fn send_prompt(&self, role: ParticipantRole, prompt: &str)
        -> Result<String, DispatchError>;
}

/// Request body sent to an automation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchRequest<'a> {
    pub role: ParticipantRole,
    pub prompt: &'a str,
}

/// Response body expected from an automation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub success: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Role→endpoint bindings plus the dispatch timeout, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Endpoint URL per role.
    #[serde(default)]
    pub endpoints: BTreeMap<ParticipantRole, String>,
    /// Seconds to wait for a response before giving up.
    #[serde(default = "GatewayConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoints: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GatewayConfig {
    fn default_timeout_secs() -> u64 {
        DEFAULT_TIMEOUT_SECS
    }

    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

/// HTTP implementation of the gateway: POSTs `{role, prompt}` to the bound
/// endpoint and expects `{success, response | error}` back.
pub struct HttpGateway {
    client: reqwest::Client,
    bindings: RwLock<BTreeMap<ParticipantRole, String>>,
}

impl HttpGateway {
    /// Build a gateway from config. Fails only if the HTTP client cannot be
    /// constructed.
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            bindings: RwLock::new(config.endpoints),
        })
    }

    /// Bind (or rebind) a role to an endpoint URL.
    pub fn bind_role(&self, role: ParticipantRole, endpoint: &str) {
        // A single map insert cannot leave the bindings inconsistent, so a
        // poisoned lock is recovered rather than propagated.
        self.bindings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(role, endpoint.to_string());
    }

    /// Endpoint currently bound to a role.
    pub fn endpoint(&self, role: ParticipantRole) -> Option<String> {
        self.bindings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&role)
            .cloned()
    }
}

#[async_trait]
impl DispatchGateway for HttpGateway {
    async fn send_prompt(
        &self,
        role: ParticipantRole,
        prompt: &str,
    ) -> Result<String, DispatchError> {
        let endpoint = self.endpoint(role).ok_or(DispatchError::NotBound(role))?;
        debug!(%role, %endpoint, "dispatching prompt");

        let response = self
            .client
            .post(&endpoint)
            .json(&DispatchRequest { role, prompt })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Timeout
                } else {
                    DispatchError::DeliveryFailed(e.to_string())
                }
            })?;

        let body: DispatchResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::DeliveryFailed(e.to_string()))?;

        if body.success {
            body.response
                .ok_or_else(|| DispatchError::DeliveryFailed("empty response body".to_string()))
        } else {
            Err(DispatchError::DeliveryFailed(
                body.error.unwrap_or_else(|| "unspecified failure".to_string()),
            ))
        }
    }
}
