use actix_web::HttpResponse;
use anyhow::Result;
use url::Url;

use crate::authn::Authn;
use crate::authz::object::{parse_target_url, validate_method, Object, ObjectError};
use crate::authz::redirect::parse_portal_url;
use crate::context::RequestContext;

use super::{forwarded_host, forwarded_proto, redirect_or_unauthorized, Variant};
use super::HEADER_X_AUTHGATE_URL;

/// Envoy `ext_authz`: the original request line is appended to the
/// endpoint path and the target host arrives in `Host`.
pub struct ExtAuthzVariant;

impl ExtAuthzVariant {
    pub const PATH_PARAM: &'static str = "path";

    /// The still encoded part of the request path captured by the
    /// endpoint route. The router decodes the capture but keeps `%2F`, so
    /// the raw path ends with as many segments as the capture holds.
    fn raw_path<'a>(ctx: &RequestContext<'a>) -> &'a str {
        let captured = ctx.req.match_info().get(Self::PATH_PARAM).unwrap_or_default();
        if captured.is_empty() {
            return "";
        }
        let segments = captured.matches('/').count() + 1;
        let path = ctx.req.path();
        match path.rmatch_indices('/').nth(segments - 1) {
            Some((idx, _)) => &path[idx + 1..],
            None => path.trim_start_matches('/'),
        }
    }
}

impl Variant for ExtAuthzVariant {
    fn get_object(&self, ctx: &RequestContext) -> Result<Object, ObjectError> {
        let method = ctx.method();
        validate_method("method", method)?;

        let proto = forwarded_proto(ctx)?;
        let host = forwarded_host(ctx)?;
        let path = Self::raw_path(ctx);
        let query = ctx.req.query_string();
        let raw = if query.is_empty() {
            format!("{proto}://{host}/{path}")
        } else {
            format!("{proto}://{host}/{path}?{query}")
        };
        let url = parse_target_url("X-Forwarded-Proto and Host headers with request path", &raw)?;
        Ok(Object::new(url, method))
    }

    fn portal_url(&self, ctx: &RequestContext) -> Result<Option<Url>> {
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
        redirect_or_unauthorized(ctx, authn, redirect)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;

    use crate::authn::AuthnType;
    use crate::context::tests::mock_providers;
    use crate::context::HEADER_HOST;

    use super::super::HEADER_X_FORWARDED_PROTO;
    use super::*;

    #[test]
    fn test_get_object() {
        let providers = mock_providers();

        let req = TestRequest::delete()
            .uri("/api/authz/ext-authz/files/1?force=true")
            .param(ExtAuthzVariant::PATH_PARAM, "files/1")
            .insert_header((HEADER_X_FORWARDED_PROTO, "https"))
            .insert_header((HEADER_HOST, "app.example.com"))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        let object = ExtAuthzVariant.get_object(&ctx).unwrap();
        assert_eq!(object.url.as_str(), "https://app.example.com/files/1?force=true");
        assert_eq!(object.method, "DELETE");

        let req = TestRequest::get()
            .uri("/api/authz/ext-authz/files%3Fid%3D1%23frag/a%2Fb?x=1")
            .param(ExtAuthzVariant::PATH_PARAM, "files?id=1#frag/a%2Fb")
            .insert_header((HEADER_X_FORWARDED_PROTO, "https"))
            .insert_header((HEADER_HOST, "app.example.com"))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        let object = ExtAuthzVariant.get_object(&ctx).unwrap();
        assert_eq!(object.url.path(), "/files%3Fid%3D1%23frag/a%2Fb");
        assert_eq!(object.url.query(), Some("x=1"));
        assert_eq!(object.url.fragment(), None);

        let req = TestRequest::default()
            .uri("/api/authz/ext-authz")
            .insert_header((HEADER_X_FORWARDED_PROTO, "https"))
            .insert_header((HEADER_HOST, "app.example.com"))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        let object = ExtAuthzVariant.get_object(&ctx).unwrap();
        assert_eq!(object.url.as_str(), "https://app.example.com/");
        assert_eq!(object.method, "GET");

        let req = TestRequest::default()
            .insert_header((HEADER_HOST, "app.example.com"))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        assert_eq!(
            ExtAuthzVariant.get_object(&ctx),
            Err(ObjectError::MissingHeader(HEADER_X_FORWARDED_PROTO))
        );
    }

    #[test]
    fn test_portal_url() {
        let providers = mock_providers();

        let req = TestRequest::default()
            .insert_header((HEADER_X_AUTHGATE_URL, "https://auth.example.com/"))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        let url = ExtAuthzVariant.portal_url(&ctx).unwrap().unwrap();
        assert_eq!(url.as_str(), "https://auth.example.com/");

        let req = TestRequest::default()
            .uri("/api/authz/ext-authz?rd=https%3A%2F%2Fauth.example.com%2F")
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        assert!(ExtAuthzVariant.portal_url(&ctx).unwrap().is_none());
    }

    #[test]
    fn test_handle_unauthorized() {
        let providers = mock_providers();
        let redirect = Url::parse("https://auth.example.com/?rd=x&rm=HEAD").unwrap();
        let mut authn = Authn::anonymous(AuthnType::Cookie);
        authn.attach(Object::new(
            Url::parse("https://app.example.com/").unwrap(),
            "HEAD",
        ));

        let req = TestRequest::default().to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        let resp = ExtAuthzVariant.handle_unauthorized(&ctx, &authn, Some(&redirect));
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get("Location").unwrap(), redirect.as_str());
    }
}
