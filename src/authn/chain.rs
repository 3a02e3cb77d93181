use anyhow::{Context, Result};
use log::{debug, trace};

use crate::context::RequestContext;
use crate::session::SessionProvider;

use super::union::UnionStrategy;
use super::{Authn, AuthnLevel, AuthnStrategy, AuthnType};

/// Strategies tried in priority order until one identifies the caller.
pub struct StrategyChain {
    strategies: Vec<UnionStrategy>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<UnionStrategy>) -> Self {
        Self { strategies }
    }

    /// Returns the resolved identity, plus the strategy that should answer
    /// a rejection when it is able to.
    ///
    /// A failing strategy that can answer rejections ends the chain with an
    /// anonymous result; any other failure is returned as an error. When no
    /// strategy identifies the caller, the last attempted one decides.
    pub fn authenticate(
        &self,
        ctx: &RequestContext,
        provider: &SessionProvider,
    ) -> Result<(Authn, Option<&UnionStrategy>)> {
        let mut matched: Option<(Authn, &UnionStrategy)> = None;
        let mut last_attempted: Option<(Authn, &UnionStrategy)> = None;

        for strategy in self.strategies.iter() {
            let authn = match strategy.get(ctx, provider) {
                Ok(authn) => authn,
                Err(err) if strategy.can_handle_unauthorized() => {
                    debug!(
                        "Strategy {:?} failed to authenticate the request: {err:#}",
                        strategy.kind()
                    );
                    return Ok((Authn::anonymous(strategy.kind()), Some(strategy)));
                }
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("authenticate with strategy {:?}", strategy.kind())
                    });
                }
            };

            if authn.level != AuthnLevel::NotAuthenticated {
                trace!(
                    "Strategy {:?} identified user '{}'",
                    strategy.kind(),
                    authn.username()
                );
                matched = Some((authn, strategy));
                break;
            }
            last_attempted = Some((authn, strategy));
        }

        let (authn, strategy) = match matched.or(last_attempted) {
            Some(result) => result,
            None => return Ok((Authn::anonymous(AuthnType::None), None)),
        };
        if strategy.can_handle_unauthorized() {
            return Ok((authn, Some(strategy)));
        }
        Ok((authn, None))
    }

    #[cfg(test)]
    pub fn kinds(&self) -> Vec<AuthnType> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }
}
