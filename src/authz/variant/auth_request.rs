use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use anyhow::Result;
use log::debug;
use url::Url;

use crate::authn::Authn;
use crate::authz::object::{parse_target_url, validate_method, Object, ObjectError};
use crate::context::RequestContext;
use crate::server::response::Response;

use super::{Variant, HEADER_X_ORIGINAL_METHOD, HEADER_X_ORIGINAL_URL};

/// NGINX `auth_request`: the proxy can only act on 2xx, 401 and 403, so
/// rejections are never redirects.
pub struct AuthRequestVariant;

impl Variant for AuthRequestVariant {
    fn get_object(&self, ctx: &RequestContext) -> Result<Object, ObjectError> {
        let raw_url = ctx
            .header(HEADER_X_ORIGINAL_URL)
            .ok_or(ObjectError::MissingHeader(HEADER_X_ORIGINAL_URL))?;
        let method = ctx
            .header(HEADER_X_ORIGINAL_METHOD)
            .ok_or(ObjectError::MissingHeader(HEADER_X_ORIGINAL_METHOD))?;
        validate_method(HEADER_X_ORIGINAL_METHOD, method)?;
        let url = parse_target_url(HEADER_X_ORIGINAL_URL, raw_url)?;
        Ok(Object::new(url, method))
    }

    fn portal_url(&self, _ctx: &RequestContext) -> Result<Option<Url>> {
        Ok(None)
    }

    fn handle_unauthorized(
        &self,
        _ctx: &RequestContext,
        authn: &Authn,
        _redirect: Option<&Url>,
    ) -> HttpResponse {
        debug!(
            "Access (method {}) is not authorized to user '{}', responding with status code 401",
            authn.method,
            authn.username()
        );
        Response::status(StatusCode::UNAUTHORIZED).into()
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use crate::authn::AuthnType;
    use crate::context::tests::mock_providers;

    use super::*;

    #[test]
    fn test_get_object() {
        let providers = mock_providers();

        let req = TestRequest::default()
            .insert_header((HEADER_X_ORIGINAL_URL, "https://app.example.com/a"))
            .insert_header((HEADER_X_ORIGINAL_METHOD, "PATCH"))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        let object = AuthRequestVariant.get_object(&ctx).unwrap();
        assert_eq!(object.url.as_str(), "https://app.example.com/a");
        assert_eq!(object.method, "PATCH");

        let req = TestRequest::default()
            .insert_header((HEADER_X_ORIGINAL_URL, "https://app.example.com/a"))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        assert_eq!(
            AuthRequestVariant.get_object(&ctx),
            Err(ObjectError::MissingHeader(HEADER_X_ORIGINAL_METHOD))
        );

        let req = TestRequest::default()
            .insert_header((HEADER_X_ORIGINAL_METHOD, "GET"))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        assert_eq!(
            AuthRequestVariant.get_object(&ctx),
            Err(ObjectError::MissingHeader(HEADER_X_ORIGINAL_URL))
        );

        let req = TestRequest::default()
            .insert_header((HEADER_X_ORIGINAL_URL, "/relative"))
            .insert_header((HEADER_X_ORIGINAL_METHOD, "GET"))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        assert!(matches!(
            AuthRequestVariant.get_object(&ctx),
            Err(ObjectError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_handle_unauthorized() {
        let providers = mock_providers();
        let req = TestRequest::default().to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        assert!(AuthRequestVariant.portal_url(&ctx).unwrap().is_none());

        let redirect = Url::parse("https://auth.example.com/").unwrap();
        let authn = Authn::anonymous(AuthnType::Cookie);
        let resp = AuthRequestVariant.handle_unauthorized(&ctx, &authn, Some(&redirect));
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().get("Location").is_none());
    }
}
