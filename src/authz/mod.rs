mod decision;
mod redirect;

pub mod builder;
pub mod config;
pub mod factory;
pub mod object;
pub mod variant;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use anyhow::{bail, Result};
use log::{debug, error, info, trace};
use url::Url;

use crate::access::Subject;
use crate::authn::chain::StrategyChain;
use crate::authn::config::RefreshInterval;
use crate::authn::{Authn, AuthnStrategy};
use crate::context::RequestContext;
use crate::server::response::{RemoteIdentity, Response};
use crate::session::SessionProvider;

use self::decision::{authz_result, AuthzResult};
use self::redirect::redirection_url;
use self::variant::{Implementation, Variant};

/// Settings an endpoint is frozen with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthzConfig {
    pub refresh_interval: RefreshInterval,

    /// Answered to requests that cannot be evaluated at all.
    pub bad_request_status: StatusCode,
}

/// One authorization endpoint: a protocol variant plus the strategies
/// callers are identified with. Read-only once built by
/// [`builder::AuthzBuilder`].
pub struct Authz {
    implementation: Implementation,
    chain: StrategyChain,
    config: AuthzConfig,
}

impl Authz {
    pub fn implementation(&self) -> Implementation {
        self.implementation
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    /// Answer a single authorization request.
    pub fn handle(&self, ctx: &RequestContext) -> HttpResponse {
        let variant = self.implementation.variant();

        let object = match variant.get_object(ctx) {
            Ok(object) => object,
            Err(err) => {
                error!("Error getting Target URL and Request Method: {err}");
                return self.bad_request();
            }
        };

        if !object.is_secure() {
            error!(
                "Target URL '{}' has an insecure scheme '{}', only the 'https' and 'wss' schemes are supported so session cookies can be transmitted securely",
                object.url,
                object.url.scheme()
            );
            return self.bad_request();
        }

        let domain = object.domain();
        let provider = match ctx.providers.sessions.provider_for_host(&domain) {
            Ok(provider) => provider,
            Err(err) => {
                error!("Target URL '{}' does not appear to be a protected domain: {err:#}", object.url);
                return self.bad_request();
            }
        };

        let portal = match self.portal_url(ctx, variant, provider) {
            Ok(portal) => portal,
            Err(err) => {
                error!("Error getting Portal URL for Target URL '{}': {err:#}", object.url);
                return self.bad_request();
            }
        };

        let (mut authn, strategy) = match self.chain.authenticate(ctx, provider) {
            Ok(result) => result,
            Err(err) => {
                error!("Error occurred while attempting to authenticate a request: {err:#}");
                return Response::status(StatusCode::UNAUTHORIZED).into();
            }
        };
        authn.attach(object.clone());

        let subject = Subject {
            username: authn.details.username.clone(),
            groups: authn.details.groups.clone(),
            ip: ctx.remote_ip(),
        };
        let (has_subject, required) = ctx.providers.authorizer.required_level(&subject, &object);

        let result = authz_result(authn.level, required, has_subject);
        trace!(
            "Access to {} (method {}) by user '{}' with level {:?} requires {:?}: {:?}",
            object.url,
            authn.method,
            authn.username(),
            authn.level,
            required,
            result
        );

        match result {
            AuthzResult::Forbidden => {
                info!(
                    "Access to {} (method {}) is forbidden to user '{}'",
                    object.url,
                    authn.method,
                    authn.username()
                );
                Response::status(StatusCode::FORBIDDEN).into()
            }
            AuthzResult::Unauthorized => {
                let redirect = portal.map(|portal| redirection_url(&object, &portal));
                match strategy {
                    Some(strategy) => {
                        debug!(
                            "Strategy {:?} answers the unauthorized request",
                            strategy.kind()
                        );
                        strategy.handle_unauthorized(ctx, &authn, redirect.as_ref())
                    }
                    None => variant.handle_unauthorized(ctx, &authn, redirect.as_ref()),
                }
            }
            AuthzResult::Authorized => {
                trace!(
                    "Access to {} (method {}) is authorized to user '{}'",
                    object.url,
                    authn.method,
                    authn.username()
                );
                Response::authorized(Self::identity(&authn)).into()
            }
        }
    }

    /// The portal supplied by the proxy, else the one configured for the
    /// cookie domain. Only Legacy endpoints can work without one.
    fn portal_url(
        &self,
        ctx: &RequestContext,
        variant: &dyn Variant,
        provider: &SessionProvider,
    ) -> Result<Option<Url>> {
        let portal = match variant.portal_url(ctx)? {
            Some(portal) => Some(portal),
            None => provider.portal_url.clone(),
        };
        if portal.is_none() && self.implementation != Implementation::Legacy {
            bail!(
                "no portal url for cookie domain '{}' and none supplied by the {} request",
                provider.domain,
                self.implementation
            );
        }
        Ok(portal)
    }

    fn bad_request(&self) -> HttpResponse {
        Response::status(self.config.bad_request_status).into()
    }

    fn identity(authn: &Authn) -> Option<RemoteIdentity> {
        if authn.is_anonymous() {
            return None;
        }
        Some(RemoteIdentity {
            user: authn.details.username.clone(),
            groups: authn.details.groups.clone(),
            name: authn.details.display_name.clone(),
            email: authn.details.emails.first().cloned().unwrap_or_default(),
        })
    }
}
