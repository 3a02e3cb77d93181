use anyhow::{bail, Result};

use crate::context::RequestContext;
use crate::session::SessionProvider;

use super::{basic, Authn, AuthnStrategy, AuthnType};
use super::{HEADER_AUTHORIZATION, HEADER_PROXY_AUTHORIZATION};

/// Header credentials the way the `/api/verify` endpoint always read them:
/// `Proxy-Authorization`, or `Authorization` when the query carries
/// `auth=basic`.
pub struct LegacyStrategy;

impl LegacyStrategy {
    const QUERY_AUTH: &'static str = "auth";
    const QUERY_AUTH_BASIC: &'static str = "basic";

    pub fn new() -> Self {
        Self
    }
}

impl AuthnStrategy for LegacyStrategy {
    fn get(&self, ctx: &RequestContext, _provider: &SessionProvider) -> Result<Authn> {
        let basic_requested = ctx
            .query_arg(Self::QUERY_AUTH)
            .is_some_and(|value| value == Self::QUERY_AUTH_BASIC);
        let (authn_type, header) = if basic_requested {
            (AuthnType::Authorization, HEADER_AUTHORIZATION)
        } else {
            (AuthnType::ProxyAuthorization, HEADER_PROXY_AUTHORIZATION)
        };

        match ctx.header(header) {
            Some(value) => basic::authenticate(ctx, authn_type, header, value),
            None if basic_requested => bail!("header {header} expected"),
            None => Ok(Authn::anonymous(authn_type)),
        }
    }

    fn kind(&self) -> AuthnType {
        AuthnType::ProxyAuthorization
    }

    fn can_handle_unauthorized(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use crate::authn::AuthnLevel;
    use crate::code;
    use crate::context::tests::mock_providers;

    use super::*;

    #[test]
    fn test_get() {
        let providers = mock_providers();
        let provider = providers.sessions.provider_for_host("example.com").unwrap();
        let strategy = LegacyStrategy::new();
        assert!(!strategy.can_handle_unauthorized());

        let credentials = format!("Basic {}", code::base64_encode("john:password"));

        let req = TestRequest::default().to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        let authn = strategy.get(&ctx, provider).unwrap();
        assert_eq!(authn.authn_type, AuthnType::ProxyAuthorization);
        assert_eq!(authn.level, AuthnLevel::NotAuthenticated);

        let req = TestRequest::default()
            .insert_header((HEADER_PROXY_AUTHORIZATION, credentials.as_str()))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        let authn = strategy.get(&ctx, provider).unwrap();
        assert_eq!(authn.authn_type, AuthnType::ProxyAuthorization);
        assert_eq!(authn.level, AuthnLevel::OneFactor);

        // Proxy-Authorization is ignored once basic auth is requested.
        let req = TestRequest::default()
            .uri("/api/verify?auth=basic")
            .insert_header((HEADER_PROXY_AUTHORIZATION, credentials.as_str()))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        assert!(strategy.get(&ctx, provider).is_err());

        let req = TestRequest::default()
            .uri("/api/verify?auth=basic")
            .insert_header((HEADER_AUTHORIZATION, credentials.as_str()))
            .to_http_request();
        let ctx = RequestContext::new(&req, &providers);
        let authn = strategy.get(&ctx, provider).unwrap();
        assert_eq!(authn.authn_type, AuthnType::Authorization);
        assert_eq!(authn.level, AuthnLevel::OneFactor);
        assert_eq!(authn.details.display_name, "John Doe");
    }
}
