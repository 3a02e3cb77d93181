mod auth_request;
mod ext_authz;
mod forward_auth;
mod legacy;

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use anyhow::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::authn::config::StrategyName;
use crate::authn::Authn;
use crate::context::{RequestContext, HEADER_HOST};
use crate::server::response::Response;

use super::object::{parse_target_url, Object, ObjectError};
use super::redirect::redirect_status;

pub use self::auth_request::AuthRequestVariant;
pub use self::ext_authz::ExtAuthzVariant;
pub use self::forward_auth::ForwardAuthVariant;
pub use self::legacy::LegacyVariant;

pub const HEADER_X_ORIGINAL_URL: &str = "X-Original-URL";
pub const HEADER_X_ORIGINAL_METHOD: &str = "X-Original-Method";
pub const HEADER_X_FORWARDED_PROTO: &str = "X-Forwarded-Proto";
pub const HEADER_X_FORWARDED_HOST: &str = "X-Forwarded-Host";
pub const HEADER_X_FORWARDED_URI: &str = "X-Forwarded-URI";
pub const HEADER_X_FORWARDED_METHOD: &str = "X-Forwarded-Method";
pub const HEADER_X_AUTHGATE_URL: &str = "X-Authgate-URL";

/// How one kind of reverse proxy describes the target and expects to be
/// told no.
pub trait Variant: Send + Sync {
    fn get_object(&self, ctx: &RequestContext) -> Result<Object, ObjectError>;

    /// Portal URL supplied by the proxy, if this dialect has a way to.
    fn portal_url(&self, ctx: &RequestContext) -> Result<Option<Url>>;

    fn handle_unauthorized(
        &self,
        ctx: &RequestContext,
        authn: &Authn,
        redirect: Option<&Url>,
    ) -> HttpResponse;
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Implementation {
    Legacy,
    ForwardAuth,
    AuthRequest,
    ExtAuthz,
}

impl Implementation {
    pub fn variant(&self) -> &'static dyn Variant {
        match self {
            Implementation::Legacy => &LegacyVariant,
            Implementation::ForwardAuth => &ForwardAuthVariant,
            Implementation::AuthRequest => &AuthRequestVariant,
            Implementation::ExtAuthz => &ExtAuthzVariant,
        }
    }

    /// Header credentials first, then the session cookie.
    pub fn default_strategies(&self) -> Vec<StrategyName> {
        let header = match self {
            Implementation::Legacy => StrategyName::HeaderLegacy,
            Implementation::AuthRequest => StrategyName::HeaderProxyAuthorizationAuthRequest,
            Implementation::ForwardAuth | Implementation::ExtAuthz => {
                StrategyName::HeaderProxyAuthorization
            }
        };
        vec![header, StrategyName::CookieSession]
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Implementation::Legacy => "Legacy",
            Implementation::ForwardAuth => "ForwardAuth",
            Implementation::AuthRequest => "AuthRequest",
            Implementation::ExtAuthz => "ExtAuthz",
        };
        write!(f, "{name}")
    }
}

fn forwarded_host<'a>(ctx: &RequestContext<'a>) -> Result<&'a str, ObjectError> {
    ctx.header(HEADER_X_FORWARDED_HOST)
        .or_else(|| ctx.header(HEADER_HOST))
        .ok_or(ObjectError::MissingHeader(HEADER_X_FORWARDED_HOST))
}

fn forwarded_proto<'a>(ctx: &RequestContext<'a>) -> Result<&'a str, ObjectError> {
    ctx.header(HEADER_X_FORWARDED_PROTO)
        .ok_or(ObjectError::MissingHeader(HEADER_X_FORWARDED_PROTO))
}

/// Target URL from `X-Forwarded-Proto`, `X-Forwarded-Host` and
/// `X-Forwarded-URI`.
fn forwarded_url(ctx: &RequestContext) -> Result<Url, ObjectError> {
    let proto = forwarded_proto(ctx)?;
    let host = forwarded_host(ctx)?;
    let uri = ctx.header(HEADER_X_FORWARDED_URI).unwrap_or("/");
    let uri_sep = if uri.starts_with('/') { "" } else { "/" };
    parse_target_url(
        "X-Forwarded-* headers",
        &format!("{proto}://{host}{uri_sep}{uri}"),
    )
}

/// Redirect browsers to the portal; API clients and callers without a
/// portal get a bare 401.
fn redirect_or_unauthorized(
    ctx: &RequestContext,
    authn: &Authn,
    redirect: Option<&Url>,
) -> HttpResponse {
    let target = authn
        .object
        .as_ref()
        .map(|object| object.url.as_str())
        .unwrap_or_default();

    let redirect = match redirect {
        Some(redirect) if !ctx.is_xhr() && ctx.accepts_html() => redirect,
        _ => {
            debug!(
                "Access to {target} (method {}) is not authorized to user '{}', responding with status code 401",
                authn.method,
                authn.username()
            );
            return Response::status(StatusCode::UNAUTHORIZED).into();
        }
    };

    let method = authn
        .object
        .as_ref()
        .map(|object| object.method.as_str())
        .unwrap_or_default();
    let status = redirect_status(method);
    let with_body = !ctx.is_head() && method != "HEAD";
    info!(
        "Access to {target} (method {}) is not authorized to user '{}', responding with status code {} with location redirect to {redirect}",
        authn.method,
        authn.username(),
        status.as_u16()
    );
    Response::redirect(status, redirect, with_body).into()
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use crate::context::tests::mock_providers;

    use super::*;

    #[test]
    fn test_forwarded_url() {
        let providers = mock_providers();
        let cases = [
            (
                vec![
                    (HEADER_X_FORWARDED_PROTO, "https"),
                    (HEADER_X_FORWARDED_HOST, "app.example.com"),
                    (HEADER_X_FORWARDED_URI, "/a/b?c=d"),
                ],
                Some("https://app.example.com/a/b?c=d"),
            ),
            (
                vec![
                    (HEADER_X_FORWARDED_PROTO, "https"),
                    (HEADER_HOST, "app.example.com:8443"),
                ],
                Some("https://app.example.com:8443/"),
            ),
            (
                vec![(HEADER_X_FORWARDED_HOST, "app.example.com")],
                None,
            ),
            (
                vec![
                    (HEADER_X_FORWARDED_PROTO, "https"),
                    (HEADER_X_FORWARDED_HOST, "app example.com"),
                ],
                None,
            ),
        ];
        for (headers, expect) in cases {
            let mut req = TestRequest::default();
            for header in headers.iter() {
                req = req.insert_header(*header);
            }
            let req = req.to_http_request();
            let ctx = RequestContext::new(&req, &providers);
            let url = forwarded_url(&ctx).ok().map(|url| url.to_string());
            assert_eq!(url.as_deref(), expect, "{headers:?}");
        }
    }

    #[test]
    fn test_default_strategies() {
        assert_eq!(
            Implementation::Legacy.default_strategies(),
            vec![StrategyName::HeaderLegacy, StrategyName::CookieSession]
        );
        assert_eq!(
            Implementation::AuthRequest.default_strategies(),
            vec![
                StrategyName::HeaderProxyAuthorizationAuthRequest,
                StrategyName::CookieSession
            ]
        );
        assert_eq!(
            Implementation::ExtAuthz.default_strategies(),
            vec![
                StrategyName::HeaderProxyAuthorization,
                StrategyName::CookieSession
            ]
        );
        assert_eq!(Implementation::ForwardAuth.to_string(), "ForwardAuth");
    }
}
