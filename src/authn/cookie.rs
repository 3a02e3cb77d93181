use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::clock::current_timestamp;
use crate::context::RequestContext;
use crate::session::{SessionProvider, UserSession};
use crate::users::{self, UserDetails};

use super::config::RefreshInterval;
use super::{Authn, AuthnLevel, AuthnStrategy, AuthnType, HEADER_SESSION_USERNAME};

/// Resolves the caller from the session cookie of the matched domain.
pub struct CookieStrategy {
    refresh: RefreshInterval,
}

impl CookieStrategy {
    pub fn new(refresh: RefreshInterval) -> Self {
        Self { refresh }
    }

    fn destroy(&self, ctx: &RequestContext, provider: &SessionProvider) -> Result<Authn> {
        provider
            .destroy_session(ctx.req)
            .context("destroy session")?;
        Ok(Authn::anonymous(AuthnType::Cookie))
    }

    /// Reload the user details when due. Returns false when the user is
    /// gone and the session has been destroyed.
    fn refresh_details(
        &self,
        ctx: &RequestContext,
        provider: &SessionProvider,
        session: &mut UserSession,
    ) -> Result<bool> {
        let now = current_timestamp();
        let due = match self.refresh {
            RefreshInterval::Disable => false,
            RefreshInterval::Always => true,
            RefreshInterval::Every(_) => session.refresh_at <= now,
        };
        if !due {
            return Ok(true);
        }

        let details = match ctx.providers.users.get_details(&session.username) {
            Ok(details) => details,
            Err(err) if users::is_not_found(&err) => {
                info!(
                    "User '{}' no longer exists, destroy the session",
                    session.username
                );
                provider
                    .destroy_session(ctx.req)
                    .context("destroy session")?;
                return Ok(false);
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("refresh details of user '{}'", session.username)
                })
            }
        };

        if Self::details_changed(session, &details) {
            debug!(
                "Updated profile detected for user '{}', update the session",
                session.username
            );
            session.display_name = details.display_name;
            session.emails = details.emails;
            session.groups = details.groups;
        }
        if let RefreshInterval::Every(interval) = self.refresh {
            session.refresh_at = now + interval.as_secs();
        }

        provider.save_session(session).context("save session")?;
        Ok(true)
    }

    fn details_changed(session: &UserSession, details: &UserDetails) -> bool {
        session.display_name != details.display_name
            || session.emails != details.emails
            || session.groups != details.groups
    }
}

impl AuthnStrategy for CookieStrategy {
    fn get(&self, ctx: &RequestContext, provider: &SessionProvider) -> Result<Authn> {
        let mut session = provider.get_session(ctx.req).context("get session")?;

        if session.cookie_domain != provider.domain {
            warn!(
                "Destroying session cookie as the cookie domain '{}' does not match the requested domain '{}'",
                session.cookie_domain, provider.domain
            );
            return self.destroy(ctx, provider);
        }

        if session.is_anonymous() {
            if session.level > AuthnLevel::NotAuthenticated {
                warn!(
                    "Destroying anonymous session with authentication level {:?}",
                    session.level
                );
                return self.destroy(ctx, provider);
            }
            return Ok(Authn::anonymous(AuthnType::Cookie));
        }

        let inactivity = provider.inactivity.as_secs();
        if !session.keep_me_logged_in
            && inactivity > 0
            && current_timestamp() > session.last_activity + inactivity
        {
            info!(
                "Session of user '{}' has been inactive for more than {}s, destroy it",
                session.username, inactivity
            );
            return self.destroy(ctx, provider);
        }

        if let Some(username) = ctx.header(HEADER_SESSION_USERNAME) {
            if !username.eq_ignore_ascii_case(&session.username) {
                warn!(
                    "Header {HEADER_SESSION_USERNAME} '{username}' does not match session user '{}', destroy the session",
                    session.username
                );
                return self.destroy(ctx, provider);
            }
        }

        if !self.refresh_details(ctx, provider, &mut session)? {
            return Ok(Authn::anonymous(AuthnType::Cookie));
        }

        let expiration = if session.keep_me_logged_in {
            provider.remember_me
        } else {
            provider.expiration
        };
        provider
            .renew_expiration(ctx.req, expiration)
            .context("renew session expiration")?;

        let details = UserDetails {
            username: session.username,
            display_name: session.display_name,
            emails: session.emails,
            groups: session.groups,
        };
        Ok(Authn::identified(AuthnType::Cookie, session.level, details))
    }

    fn kind(&self) -> AuthnType {
        AuthnType::Cookie
    }

    fn can_handle_unauthorized(&self) -> bool {
        false
    }
}
