use actix_web::HttpResponse;
use anyhow::Result;
use url::Url;

use crate::authn::Authn;
use crate::authz::object::{validate_method, Object, ObjectError};
use crate::authz::redirect::parse_portal_url;
use crate::context::RequestContext;

use super::{forwarded_url, redirect_or_unauthorized, Variant, HEADER_X_FORWARDED_METHOD};

/// Traefik, Caddy and friends: the target is spread over `X-Forwarded-*`
/// headers.
pub struct ForwardAuthVariant;

impl ForwardAuthVariant {
    const QUERY_PORTAL: &'static str = "authgate_url";
}

impl Variant for ForwardAuthVariant {
    fn get_object(&self, ctx: &RequestContext) -> Result<Object, ObjectError> {
        let method = ctx
            .header(HEADER_X_FORWARDED_METHOD)
            .ok_or(ObjectError::MissingHeader(HEADER_X_FORWARDED_METHOD))?;
        validate_method(HEADER_X_FORWARDED_METHOD, method)?;
        let url = forwarded_url(ctx)?;
        Ok(Object::new(url, method))
    }

    fn portal_url(&self, ctx: &RequestContext) -> Result<Option<Url>> {
        match ctx.query_arg(Self::QUERY_PORTAL) {
            Some(raw) => parse_portal_url("query argument 'authgate_url'", &raw).map(Some),
            None => Ok(None),
        }
    }

    fn handle_unauthorized(
        &self,
        ctx: &RequestContext,
        authn: &Authn,
        redirect: Option<&Url>,
    ) -> HttpResponse {
        redirect_or_unauthorized(ctx, authn, redirect)
    }
}
