use actix_web::http::StatusCode;
use anyhow::{bail, Context, Result};

use crate::authn::chain::StrategyChain;
use crate::authn::config::{RefreshInterval, StrategyName};
use crate::authn::union::UnionStrategy;

use super::variant::Implementation;
use super::{Authz, AuthzConfig};

/// Assembles an immutable [`Authz`] for one endpoint.
pub struct AuthzBuilder {
    implementation: Implementation,
    strategies: Vec<StrategyName>,
    refresh_interval: RefreshInterval,
    bad_request_status: u16,
}

impl AuthzBuilder {
    pub fn new(implementation: Implementation) -> Self {
        Self {
            implementation,
            strategies: implementation.default_strategies(),
            refresh_interval: RefreshInterval::default(),
            bad_request_status: StatusCode::UNAUTHORIZED.as_u16(),
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<StrategyName>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_refresh_interval(mut self, refresh_interval: RefreshInterval) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    pub fn with_bad_request_status(mut self, status: u16) -> Self {
        self.bad_request_status = status;
        self
    }

    pub fn build(self) -> Result<Authz> {
        if self.strategies.is_empty() {
            bail!("{} endpoint needs at least one strategy", self.implementation);
        }
        let bad_request_status = StatusCode::from_u16(self.bad_request_status)
            .with_context(|| format!("invalid bad request status {}", self.bad_request_status))?;
        if !bad_request_status.is_client_error() && !bad_request_status.is_server_error() {
            bail!("bad request status {bad_request_status} is not an error status");
        }
        if self.implementation == Implementation::Legacy
            && bad_request_status != StatusCode::UNAUTHORIZED
        {
            bail!("Legacy endpoints always answer bad requests with 401");
        }

        let strategies = self
            .strategies
            .into_iter()
            .map(|name| UnionStrategy::from_name(name, self.refresh_interval))
            .collect();

        Ok(Authz {
            implementation: self.implementation,
            chain: StrategyChain::new(strategies),
            config: AuthzConfig {
                refresh_interval: self.refresh_interval,
                bad_request_status,
            },
        })
    }
}
