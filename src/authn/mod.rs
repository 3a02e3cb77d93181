mod basic;
mod cookie;
mod header;
mod legacy;

pub mod chain;
pub mod config;
pub mod union;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use anyhow::Result;
use url::Url;

use crate::authz::object::{friendly_method, Object};
use crate::context::RequestContext;
use crate::server::response::Response;
use crate::session::SessionProvider;
use crate::users::UserDetails;

pub use self::basic::CHALLENGE as BASIC_CHALLENGE;
pub use self::cookie::CookieStrategy;
pub use self::header::HeaderStrategy;
pub use self::legacy::LegacyStrategy;

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_PROXY_AUTHORIZATION: &str = "Proxy-Authorization";
pub const HEADER_WWW_AUTHENTICATE: &str = "WWW-Authenticate";
pub const HEADER_PROXY_AUTHENTICATE: &str = "Proxy-Authenticate";
pub const HEADER_SESSION_USERNAME: &str = "Session-Username";

/// How strongly the caller proved their identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuthnLevel {
    #[default]
    NotAuthenticated,
    OneFactor,
    TwoFactor,
}

/// The request signal an identity was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthnType {
    None,
    Cookie,
    Authorization,
    ProxyAuthorization,
}

/// Authentication state of a single authorization request.
#[derive(Debug, Clone)]
pub struct Authn {
    pub authn_type: AuthnType,
    pub level: AuthnLevel,
    pub details: UserDetails,

    pub object: Option<Object>,
    /// Target method for display, `unknown` when the proxy sent none.
    pub method: String,
}

impl Authn {
    pub fn anonymous(authn_type: AuthnType) -> Self {
        Self {
            authn_type,
            level: AuthnLevel::NotAuthenticated,
            details: UserDetails::default(),
            object: None,
            method: String::new(),
        }
    }

    pub fn identified(authn_type: AuthnType, level: AuthnLevel, details: UserDetails) -> Self {
        Self {
            authn_type,
            level,
            details,
            object: None,
            method: String::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.details.username.is_empty()
    }

    pub fn username(&self) -> &str {
        if self.is_anonymous() {
            return "<anonymous>";
        }
        &self.details.username
    }

    pub fn attach(&mut self, object: Object) {
        self.method = friendly_method(&object.method);
        self.object = Some(object);
    }
}

/// A source of caller identity, tried in order by [`chain::StrategyChain`].
pub trait AuthnStrategy: Send + Sync {
    /// Resolve the caller. Absent credentials yield a
    /// [`AuthnLevel::NotAuthenticated`] result, not an error.
    fn get(&self, ctx: &RequestContext, provider: &SessionProvider) -> Result<Authn>;

    fn kind(&self) -> AuthnType;

    /// Whether this strategy answers rejected requests itself instead of
    /// leaving it to the endpoint implementation.
    fn can_handle_unauthorized(&self) -> bool;

    fn handle_unauthorized(
        &self,
        _ctx: &RequestContext,
        _authn: &Authn,
        _redirect: Option<&Url>,
    ) -> HttpResponse {
        Response::status(StatusCode::UNAUTHORIZED).into()
    }
}
