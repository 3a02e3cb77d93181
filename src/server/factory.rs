use std::path::Path;
use std::sync::Arc;

use actix_web::web::Data;
use anyhow::{Context, Result};
use log::warn;
use openssl::ssl::{SslAcceptor, SslAcceptorBuilder, SslFiletype, SslMethod};

use crate::access::RuleAuthorizer;
use crate::authz::factory::AuthzFactory;
use crate::context::Providers;
use crate::session::Sessions;
use crate::users::FileUserProvider;

use super::config::ServerConfig;
use super::restful::{RestfulContext, RestfulServer};

pub struct ServerFactory {
    cfg: ServerConfig,
}

impl ServerFactory {
    pub fn new(cfg: ServerConfig) -> Self {
        Self { cfg }
    }

    pub fn build_server(&self) -> Result<RestfulServer> {
        let ssl = self.build_ssl()?;
        let ctx = self.build_context()?;

        let mut srv = RestfulServer::new(self.cfg.bind.clone(), ssl, ctx);
        if self.cfg.keep_alive_secs > 0 {
            srv.set_keep_alive_secs(self.cfg.keep_alive_secs);
        }
        if self.cfg.workers > 0 {
            srv.set_workers(self.cfg.workers);
        }

        Ok(srv)
    }

    pub fn build_ssl(&self) -> Result<Option<SslAcceptorBuilder>> {
        if !self.cfg.ssl {
            return Ok(None);
        }

        let mut builder =
            SslAcceptor::mozilla_intermediate(SslMethod::tls()).context("init ssl acceptor")?;

        builder
            .set_private_key_file(&self.cfg.key_path, SslFiletype::PEM)
            .context("load ssl key file")?;
        builder
            .set_certificate_chain_file(&self.cfg.cert_path)
            .context("load ssl cert file")?;

        Ok(Some(builder))
    }

    pub fn build_providers(&self) -> Result<Providers> {
        let authorizer =
            RuleAuthorizer::new(&self.cfg.access_control).context("init access control")?;
        let users = FileUserProvider::load(Path::new(&self.cfg.users.path))
            .context("init users provider")?;

        let sessions = Sessions::new(&self.cfg.session).context("init sessions")?;
        if sessions.is_empty() {
            warn!("No session cookie domain configured, every authz request will be rejected");
        }

        Ok(Providers {
            authorizer: Arc::new(authorizer),
            users: Arc::new(users),
            sessions: Arc::new(sessions),
        })
    }

    pub fn build_context(&self) -> Result<Arc<RestfulContext>> {
        let providers = self.build_providers()?;

        let authz_factory = AuthzFactory::new();
        let endpoints = authz_factory
            .build_endpoints(&self.cfg.authz)
            .context("init authz endpoints")?;

        Ok(Arc::new(RestfulContext {
            providers: Data::new(providers),
            endpoints,
        }))
    }
}
