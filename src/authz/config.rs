use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::authn::config::{RefreshInterval, StrategyName};
use crate::config::CommonConfig;

use super::variant::Implementation;

/// The authorization endpoints to serve.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointsConfig {
    /// How often cookie sessions reload user details: `disable`, `always`
    /// or a duration such as `5m`.
    #[serde(default)]
    pub refresh_interval: RefreshInterval,

    /// When empty, one endpoint of every implementation is served.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub name: String,

    pub implementation: Implementation,

    /// Defaults to the implementation's own strategies.
    #[serde(default)]
    pub strategies: Option<Vec<StrategyName>>,

    /// Status answered to requests that cannot be evaluated. Legacy
    /// endpoints only accept 401.
    #[serde(default)]
    pub bad_request_status: Option<u16>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            refresh_interval: RefreshInterval::default(),
            endpoints: Vec::new(),
        }
    }
}

impl CommonConfig for EndpointsConfig {
    fn complete(&mut self) -> Result<()> {
        if self.endpoints.is_empty() {
            self.endpoints = Self::default_endpoints();
        }

        let mut names = HashSet::with_capacity(self.endpoints.len());
        for endpoint in self.endpoints.iter() {
            endpoint
                .validate()
                .with_context(|| format!("validate endpoint '{}'", endpoint.name))?;
            if !names.insert(endpoint.name.as_str()) {
                bail!("duplicate endpoint name '{}'", endpoint.name);
            }
        }

        Ok(())
    }
}

impl EndpointsConfig {
    pub fn default_endpoints() -> Vec<EndpointConfig> {
        [
            ("verify", Implementation::Legacy),
            ("forward-auth", Implementation::ForwardAuth),
            ("auth-request", Implementation::AuthRequest),
            ("ext-authz", Implementation::ExtAuthz),
        ]
        .into_iter()
        .map(|(name, implementation)| EndpointConfig {
            name: String::from(name),
            implementation,
            strategies: None,
            bad_request_status: None,
        })
        .collect()
    }
}

impl EndpointConfig {
    /// Legacy endpoints are mounted beside the other API routes, so they
    /// must not shadow them.
    const RESERVED_NAMES: [&'static str; 3] = ["authz", "firstfactor", "health"];

    pub fn path(&self) -> String {
        match self.implementation {
            Implementation::Legacy => format!("/api/{}", self.name),
            _ => format!("/api/authz/{}", self.name),
        }
    }

    pub fn strategies(&self) -> Vec<StrategyName> {
        match self.strategies.as_ref() {
            Some(strategies) => strategies.clone(),
            None => self.implementation.default_strategies(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            bail!("endpoint name cannot be empty");
        }
        let valid_chars = self
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid_chars {
            bail!(
                "endpoint name '{}' may only contain lowercase letters, digits, '-' and '_'",
                self.name
            );
        }
        if Self::RESERVED_NAMES.contains(&self.name.as_str()) {
            bail!("endpoint name '{}' is reserved", self.name);
        }

        if let Some(strategies) = self.strategies.as_ref() {
            if strategies.is_empty() {
                bail!("strategies cannot be empty, omit the field to use the defaults");
            }
        }

        if let Some(status) = self.bad_request_status {
            if !(400..=599).contains(&status) {
                bail!("bad_request_status {status} is not an error status code");
            }
            if self.implementation == Implementation::Legacy && status != 401 {
                bail!("bad_request_status of a Legacy endpoint must be 401, found {status}");
            }
        }

        Ok(())
    }
}
