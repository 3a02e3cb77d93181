use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use anyhow::Result;
use log::debug;
use url::Url;

use crate::authn::{Authn, AuthnType, BASIC_CHALLENGE, HEADER_WWW_AUTHENTICATE};
use crate::authz::object::{parse_target_url, validate_method, Object, ObjectError};
use crate::authz::redirect::parse_portal_url;
use crate::context::RequestContext;
use crate::server::response::Response;

use super::{forwarded_url, redirect_or_unauthorized, Variant};
use super::{HEADER_X_AUTHGATE_URL, HEADER_X_FORWARDED_METHOD, HEADER_X_ORIGINAL_URL};

/// The combined `/api/verify` endpoint, compatible with most proxies.
pub struct LegacyVariant;

impl LegacyVariant {
    const QUERY_PORTAL: &'static str = "rd";
}

impl Variant for LegacyVariant {
    fn get_object(&self, ctx: &RequestContext) -> Result<Object, ObjectError> {
        let url = match ctx.header(HEADER_X_ORIGINAL_URL) {
            Some(raw) => parse_target_url(HEADER_X_ORIGINAL_URL, raw)?,
            None => forwarded_url(ctx)?,
        };
        let method = ctx
            .header(HEADER_X_FORWARDED_METHOD)
            .unwrap_or_else(|| ctx.method());
        validate_method(HEADER_X_FORWARDED_METHOD, method)?;
        Ok(Object::new(url, method))
    }

    fn portal_url(&self, ctx: &RequestContext) -> Result<Option<Url>> {
        if let Some(raw) = ctx.query_arg(Self::QUERY_PORTAL) {
            return parse_portal_url("query argument 'rd'", &raw).map(Some);
        }
        match ctx.header(HEADER_X_AUTHGATE_URL) {
            Some(raw) => parse_portal_url(HEADER_X_AUTHGATE_URL, raw).map(Some),
            None => Ok(None),
        }
    }

    fn handle_unauthorized(
        &self,
        ctx: &RequestContext,
        authn: &Authn,
        redirect: Option<&Url>,
    ) -> HttpResponse {
        if authn.authn_type == AuthnType::Authorization {
            debug!(
                "Access to {} is not authorized to user '{}', responding with basic challenge",
                authn
                    .object
                    .as_ref()
                    .map(|object| object.url.as_str())
                    .unwrap_or_default(),
                authn.username()
            );
            return Response::challenge(
                StatusCode::UNAUTHORIZED,
                HEADER_WWW_AUTHENTICATE,
                BASIC_CHALLENGE,
            )
            .into();
        }
        redirect_or_unauthorized(ctx, authn, redirect)
    }
}
