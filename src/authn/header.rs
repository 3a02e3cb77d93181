use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use anyhow::Result;
use log::debug;
use url::Url;

use crate::context::RequestContext;
use crate::server::response::Response;
use crate::session::SessionProvider;

use super::{basic, Authn, AuthnStrategy, AuthnType};
use super::{
    HEADER_AUTHORIZATION, HEADER_PROXY_AUTHENTICATE, HEADER_PROXY_AUTHORIZATION,
    HEADER_WWW_AUTHENTICATE,
};

/// Reads `Basic` credentials from a header and answers rejected requests
/// with a challenge.
pub struct HeaderStrategy {
    authn_type: AuthnType,
    header: &'static str,
    challenge_header: &'static str,
    challenge_status: StatusCode,
}

impl HeaderStrategy {
    pub fn authorization() -> Self {
        Self {
            authn_type: AuthnType::Authorization,
            header: HEADER_AUTHORIZATION,
            challenge_header: HEADER_WWW_AUTHENTICATE,
            challenge_status: StatusCode::UNAUTHORIZED,
        }
    }

    pub fn proxy_authorization() -> Self {
        Self {
            authn_type: AuthnType::ProxyAuthorization,
            header: HEADER_PROXY_AUTHORIZATION,
            challenge_header: HEADER_PROXY_AUTHENTICATE,
            challenge_status: StatusCode::PROXY_AUTHENTICATION_REQUIRED,
        }
    }

    /// nginx `auth_request` only forwards 401 and 403, so the proxy
    /// challenge is sent as a regular one.
    pub fn proxy_authorization_auth_request() -> Self {
        Self {
            authn_type: AuthnType::ProxyAuthorization,
            header: HEADER_PROXY_AUTHORIZATION,
            challenge_header: HEADER_WWW_AUTHENTICATE,
            challenge_status: StatusCode::UNAUTHORIZED,
        }
    }
}

impl AuthnStrategy for HeaderStrategy {
    fn get(&self, ctx: &RequestContext, _provider: &SessionProvider) -> Result<Authn> {
        match ctx.header(self.header) {
            Some(value) => basic::authenticate(ctx, self.authn_type, self.header, value),
            None => Ok(Authn::anonymous(self.authn_type)),
        }
    }

    fn kind(&self) -> AuthnType {
        self.authn_type
    }

    fn can_handle_unauthorized(&self) -> bool {
        true
    }

    fn handle_unauthorized(
        &self,
        _ctx: &RequestContext,
        authn: &Authn,
        _redirect: Option<&Url>,
    ) -> HttpResponse {
        debug!(
            "Responding {} with {} challenge for user '{}'",
            self.challenge_status.as_u16(),
            self.challenge_header,
            authn.username()
        );
        Response::challenge(self.challenge_status, self.challenge_header, basic::CHALLENGE).into()
    }
}
