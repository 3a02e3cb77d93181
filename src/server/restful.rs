use std::sync::Arc;
use std::time::Duration;

use actix_web::web::{self, Data, ServiceConfig};
use actix_web::{App, HttpServer};
use anyhow::{Context, Result};
use log::{info, warn};
use openssl::ssl::SslAcceptorBuilder;
use sd_notify::NotifyState;

use crate::authz::factory::Endpoint;
use crate::context::Providers;

use super::handlers;

pub struct RestfulServer {
    bind: String,
    ssl: Option<SslAcceptorBuilder>,
    ctx: Arc<RestfulContext>,

    keep_alive_secs: Option<u64>,
    workers: Option<u64>,
}

/// Everything the route table is built from, shared by all workers.
pub struct RestfulContext {
    pub providers: Data<Providers>,
    pub endpoints: Vec<Endpoint>,
}

impl RestfulServer {
    pub fn new(bind: String, ssl: Option<SslAcceptorBuilder>, ctx: Arc<RestfulContext>) -> Self {
        Self {
            bind,
            ssl,
            ctx,
            keep_alive_secs: None,
            workers: None,
        }
    }

    pub fn set_keep_alive_secs(&mut self, secs: u64) {
        self.keep_alive_secs = Some(secs);
    }

    pub fn set_workers(&mut self, workers: u64) {
        self.workers = Some(workers);
    }

    pub async fn run(self) -> Result<()> {
        let ctx = self.ctx.clone();
        let mut srv = HttpServer::new(move || {
            let ctx = ctx.clone();
            App::new()
                .configure(move |cfg| ctx.configure(cfg))
                .default_service(web::route().to(handlers::default_handler))
        });
        if let Some(secs) = self.keep_alive_secs {
            srv = srv.keep_alive(Duration::from_secs(secs));
        }
        if let Some(workers) = self.workers {
            srv = srv.workers(workers as usize);
        }

        let srv = match self.ssl {
            Some(ssl) => {
                info!("Binding to: https://{}", self.bind);
                srv.bind_openssl(&self.bind, ssl)
                    .context("bind server with ssl")?
            }
            None => {
                warn!("Serving plain HTTP, only expose this server to the reverse proxy");
                info!("Binding to: http://{}", self.bind);
                srv.bind(&self.bind).context("bind server")?
            }
        };

        sd_notify::notify(true, &[NotifyState::Ready]).context("notify systemd")?;
        info!("Starting authgate server");
        srv.run().await.context("run server")?;

        info!("Authgate server stopped by user");
        Ok(())
    }
}

impl RestfulContext {
    /// Register every route. Authz endpoints accept any method.
    pub fn configure(&self, cfg: &mut ServiceConfig) {
        cfg.app_data(self.providers.clone())
            .route("/api/health", web::get().to(handlers::health))
            .route("/api/firstfactor", web::post().to(handlers::first_factor));

        for endpoint in self.endpoints.iter() {
            let resource = if endpoint.is_prefix() {
                web::resource(vec![
                    endpoint.path.clone(),
                    format!("{}/{{path:.*}}", endpoint.path),
                ])
            } else {
                web::resource(endpoint.path.clone())
            };
            cfg.service(
                resource
                    .app_data(endpoint.authz.clone())
                    .route(web::route().to(handlers::authz)),
            );
        }
    }
}
