use actix_web::web::Data;
use anyhow::{Context, Result};
use log::info;

use super::builder::AuthzBuilder;
use super::config::EndpointsConfig;
use super::variant::Implementation;
use super::Authz;

/// A built authorization endpoint and where it is mounted.
pub struct Endpoint {
    pub name: String,
    pub path: String,
    pub authz: Data<Authz>,
}

impl Endpoint {
    /// ExtAuthz receives the original request path appended to its own.
    pub fn is_prefix(&self) -> bool {
        self.authz.implementation() == Implementation::ExtAuthz
    }
}

pub struct AuthzFactory;

impl AuthzFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn build_endpoints(&self, cfg: &EndpointsConfig) -> Result<Vec<Endpoint>> {
        let mut endpoints = Vec::with_capacity(cfg.endpoints.len());
        for endpoint in cfg.endpoints.iter() {
            let mut builder = AuthzBuilder::new(endpoint.implementation)
                .with_strategies(endpoint.strategies())
                .with_refresh_interval(cfg.refresh_interval);
            if let Some(status) = endpoint.bad_request_status {
                builder = builder.with_bad_request_status(status);
            }
            let authz = builder
                .build()
                .with_context(|| format!("build authz endpoint '{}'", endpoint.name))?;

            let path = endpoint.path();
            info!(
                "Register {} authz endpoint '{}' at '{path}'",
                endpoint.implementation, endpoint.name
            );
            endpoints.push(Endpoint {
                name: endpoint.name.clone(),
                path,
                authz: Data::new(authz),
            });
        }
        Ok(endpoints)
    }
}
