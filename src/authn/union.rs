use actix_web::HttpResponse;
use anyhow::Result;
use url::Url;

use crate::context::RequestContext;
use crate::session::SessionProvider;

use super::config::{RefreshInterval, StrategyName};
use super::{Authn, AuthnStrategy, AuthnType, CookieStrategy, HeaderStrategy, LegacyStrategy};

pub enum UnionStrategy {
    Header(HeaderStrategy),
    Legacy(LegacyStrategy),
    Cookie(CookieStrategy),
}

impl UnionStrategy {
    pub fn from_name(name: StrategyName, refresh: RefreshInterval) -> Self {
        match name {
            StrategyName::HeaderAuthorization => Self::Header(HeaderStrategy::authorization()),
            StrategyName::HeaderProxyAuthorization => {
                Self::Header(HeaderStrategy::proxy_authorization())
            }
            StrategyName::HeaderProxyAuthorizationAuthRequest => {
                Self::Header(HeaderStrategy::proxy_authorization_auth_request())
            }
            StrategyName::HeaderLegacy => Self::Legacy(LegacyStrategy::new()),
            StrategyName::CookieSession => Self::Cookie(CookieStrategy::new(refresh)),
        }
    }
}

impl AuthnStrategy for UnionStrategy {
    fn get(&self, ctx: &RequestContext, provider: &SessionProvider) -> Result<Authn> {
        match self {
            UnionStrategy::Header(strategy) => strategy.get(ctx, provider),
            UnionStrategy::Legacy(strategy) => strategy.get(ctx, provider),
            UnionStrategy::Cookie(strategy) => strategy.get(ctx, provider),
        }
    }

    fn kind(&self) -> AuthnType {
        match self {
            UnionStrategy::Header(strategy) => strategy.kind(),
            UnionStrategy::Legacy(strategy) => strategy.kind(),
            UnionStrategy::Cookie(strategy) => strategy.kind(),
        }
    }

    fn can_handle_unauthorized(&self) -> bool {
        match self {
            UnionStrategy::Header(strategy) => strategy.can_handle_unauthorized(),
            UnionStrategy::Legacy(strategy) => strategy.can_handle_unauthorized(),
            UnionStrategy::Cookie(strategy) => strategy.can_handle_unauthorized(),
        }
    }

    fn handle_unauthorized(
        &self,
        ctx: &RequestContext,
        authn: &Authn,
        redirect: Option<&Url>,
    ) -> HttpResponse {
        match self {
            UnionStrategy::Header(strategy) => strategy.handle_unauthorized(ctx, authn, redirect),
            UnionStrategy::Legacy(strategy) => strategy.handle_unauthorized(ctx, authn, redirect),
            UnionStrategy::Cookie(strategy) => strategy.handle_unauthorized(ctx, authn, redirect),
        }
    }
}
