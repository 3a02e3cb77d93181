pub mod config;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use url::Url;

use crate::authn::AuthnLevel;
use crate::clock::current_timestamp;
use crate::code;

use self::config::{CookieConfig, SessionConfig};

/// Session state kept server side, keyed by the id stored in the cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub id: String,
    pub cookie_domain: String,

    pub username: String,
    pub display_name: String,
    pub emails: Vec<String>,
    pub groups: Vec<String>,

    pub level: AuthnLevel,
    pub keep_me_logged_in: bool,

    pub last_activity: u64,
    /// Next time the user details should be reloaded, 0 when never loaded.
    pub refresh_at: u64,
    pub expires_at: u64,
}

impl UserSession {
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }
}

/// In-memory session storage shared by every cookie domain.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, UserSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expired sessions are removed and reported as missing.
    pub fn get(&self, id: &str) -> Result<Option<UserSession>> {
        let mut sessions = self.lock()?;
        let expired = match sessions.get(id) {
            Some(session) => session.expires_at <= current_timestamp(),
            None => return Ok(None),
        };
        if expired {
            debug!("Session '{id}' expired, remove it");
            sessions.remove(id);
            return Ok(None);
        }
        Ok(sessions.get(id).cloned())
    }

    /// Sessions that already expired are pruned on every save, so cookies
    /// never presented again do not pile up.
    pub fn save(&self, session: UserSession) -> Result<()> {
        let mut sessions = self.lock()?;
        let now = current_timestamp();
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("Pruned {pruned} expired session(s)");
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let mut sessions = self.lock()?;
        sessions.remove(id);
        Ok(())
    }

    #[cfg(test)]
    pub fn count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, UserSession>>> {
        self.sessions
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))
    }
}

/// Issues and resolves sessions for one cookie domain.
pub struct SessionProvider {
    pub domain: String,
    pub cookie_name: String,
    pub portal_url: Option<Url>,

    pub expiration: Duration,
    pub inactivity: Duration,
    pub remember_me: Duration,

    store: Arc<SessionStore>,
}

impl SessionProvider {
    pub fn new(cfg: &CookieConfig, common: &SessionConfig, store: Arc<SessionStore>) -> Result<Self> {
        let portal_url = match cfg.portal_url.as_ref() {
            Some(url) => {
                Some(Url::parse(url).with_context(|| format!("parse portal url '{url}'"))?)
            }
            None => None,
        };
        Ok(Self {
            domain: cfg.domain.clone(),
            cookie_name: cfg.name.clone().unwrap_or_else(|| common.name.clone()),
            portal_url,
            expiration: Duration::from_secs(cfg.expiration_secs.unwrap_or(common.expiration_secs)),
            inactivity: Duration::from_secs(cfg.inactivity_secs.unwrap_or(common.inactivity_secs)),
            remember_me: Duration::from_secs(
                cfg.remember_me_secs.unwrap_or(common.remember_me_secs),
            ),
            store,
        })
    }

    /// A fresh anonymous session bound to this domain. It is not stored
    /// until [`SessionProvider::save_session`] is called.
    pub fn new_session(&self) -> UserSession {
        let now = current_timestamp();
        UserSession {
            id: code::random_string(32),
            cookie_domain: self.domain.clone(),
            username: String::new(),
            display_name: String::new(),
            emails: Vec::new(),
            groups: Vec::new(),
            level: AuthnLevel::NotAuthenticated,
            keep_me_logged_in: false,
            last_activity: now,
            refresh_at: 0,
            expires_at: now + self.expiration.as_secs(),
        }
    }

    /// The session referenced by the request cookie, or a fresh anonymous
    /// one when there is none.
    pub fn get_session(&self, req: &HttpRequest) -> Result<UserSession> {
        let id = match self.session_id(req) {
            Some(id) => id,
            None => return Ok(self.new_session()),
        };
        match self.store.get(&id)? {
            Some(session) => Ok(session),
            None => Ok(self.new_session()),
        }
    }

    pub fn save_session(&self, session: &UserSession) -> Result<()> {
        self.store.save(session.clone())
    }

    pub fn destroy_session(&self, req: &HttpRequest) -> Result<()> {
        if let Some(id) = self.session_id(req) {
            info!("Destroy session '{id}' of domain '{}'", self.domain);
            self.store.delete(&id)?;
        }
        Ok(())
    }

    /// Push back the expiry of the request's session and mark it active.
    pub fn renew_expiration(&self, req: &HttpRequest, expiration: Duration) -> Result<()> {
        let id = match self.session_id(req) {
            Some(id) => id,
            None => bail!("no session cookie '{}' in request", self.cookie_name),
        };
        let mut session = match self.store.get(&id)? {
            Some(session) => session,
            None => bail!("session '{id}' not found"),
        };

        let now = current_timestamp();
        session.last_activity = now;
        session.expires_at = now + expiration.as_secs();
        self.store.save(session)
    }

    /// The cookie carrying the session id back to the browser.
    pub fn cookie(&self, session: &UserSession) -> Cookie<'static> {
        let mut builder = Cookie::build(self.cookie_name.clone(), session.id.clone())
            .domain(self.domain.clone())
            .path("/")
            .secure(true)
            .http_only(true)
            .same_site(SameSite::Lax);
        if session.keep_me_logged_in {
            builder = builder.max_age(CookieDuration::seconds(self.remember_me.as_secs() as i64));
        }
        builder.finish()
    }

    fn session_id(&self, req: &HttpRequest) -> Option<String> {
        let cookie = req.cookie(&self.cookie_name)?;
        let id = cookie.value();
        if id.is_empty() {
            return None;
        }
        Some(id.to_string())
    }
}

/// All configured session providers, one per cookie domain.
pub struct Sessions {
    providers: Vec<SessionProvider>,
}

impl Sessions {
    pub fn new(cfg: &SessionConfig) -> Result<Self> {
        let store = Arc::new(SessionStore::new());
        let providers = cfg
            .cookies
            .iter()
            .map(|cookie| SessionProvider::new(cookie, cfg, store.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { providers })
    }

    /// The most specific provider whose domain is `host` or a parent of it.
    pub fn provider_for_host(&self, host: &str) -> Result<&SessionProvider> {
        let host = host.trim_end_matches('.').to_lowercase();
        let mut matched: Option<&SessionProvider> = None;
        for provider in self.providers.iter() {
            let is_match = host == provider.domain
                || host
                    .strip_suffix(provider.domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'));
            if !is_match {
                continue;
            }
            if matched.map_or(true, |m| provider.domain.len() > m.domain.len()) {
                matched = Some(provider);
            }
        }
        match matched {
            Some(provider) => Ok(provider),
            None => bail!("no session cookie domain configured for host '{host}'"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
pub mod tests {
    use actix_web::test::TestRequest;

    use crate::clock::advance_mock_time;
    use crate::config::CommonConfig;

    use super::*;

    pub fn mock_sessions() -> Sessions {
        let mut cfg: SessionConfig = toml::from_str(
            r#"
            [[cookies]]
            domain = "example.com"
            portal_url = "https://auth.example.com/"

            [[cookies]]
            domain = "secure.example.com"
            name = "secure_session"
            portal_url = "https://login.secure.example.com/?lang=en"

            [[cookies]]
            domain = "example.org"
            inactivity_secs = 10
            "#,
        )
        .unwrap();
        cfg.complete().unwrap();
        Sessions::new(&cfg).unwrap()
    }

    #[test]
    fn test_provider_for_host() {
        let sessions = mock_sessions();
        let cases = [
            ("example.com", "example.com"),
            ("app.example.com", "example.com"),
            ("APP.Example.com", "example.com"),
            ("secure.example.com", "secure.example.com"),
            ("a.b.secure.example.com", "secure.example.com"),
            ("insecure.example.com", "example.com"),
            ("www.example.org", "example.org"),
        ];
        for (host, domain) in cases {
            let provider = sessions.provider_for_host(host).unwrap();
            assert_eq!(provider.domain, domain, "{host}");
        }

        for host in ["example.net", "notexample.com", "com", ""] {
            assert!(sessions.provider_for_host(host).is_err(), "{host}");
        }

        let provider = sessions.provider_for_host("example.org").unwrap();
        assert!(provider.portal_url.is_none());
        assert_eq!(provider.cookie_name, "authgate_session");
        let provider = sessions.provider_for_host("secure.example.com").unwrap();
        assert_eq!(provider.cookie_name, "secure_session");
    }

    #[test]
    fn test_session_lifecycle() {
        let sessions = mock_sessions();
        let provider = sessions.provider_for_host("app.example.com").unwrap();

        let req = TestRequest::default().to_http_request();
        let session = provider.get_session(&req).unwrap();
        assert!(session.is_anonymous());
        assert_eq!(session.level, AuthnLevel::NotAuthenticated);
        assert_eq!(session.cookie_domain, "example.com");

        let mut session = provider.new_session();
        session.username = String::from("john");
        session.level = AuthnLevel::OneFactor;
        provider.save_session(&session).unwrap();

        let req = TestRequest::default()
            .cookie(provider.cookie(&session))
            .to_http_request();
        let loaded = provider.get_session(&req).unwrap();
        assert_eq!(loaded, session);

        advance_mock_time(5);
        provider
            .renew_expiration(&req, Duration::from_secs(100))
            .unwrap();
        let loaded = provider.get_session(&req).unwrap();
        assert!(loaded.last_activity > session.last_activity);
        assert_eq!(loaded.expires_at, loaded.last_activity + 100);

        provider.destroy_session(&req).unwrap();
        let loaded = provider.get_session(&req).unwrap();
        assert!(loaded.is_anonymous());
        assert_ne!(loaded.id, session.id);
        assert!(provider.renew_expiration(&req, provider.expiration).is_err());
    }

    #[test]
    fn test_session_expired() {
        let store = SessionStore::new();
        let now = current_timestamp();
        let session = UserSession {
            id: String::from("expired"),
            cookie_domain: String::from("example.com"),
            username: String::from("john"),
            display_name: String::new(),
            emails: Vec::new(),
            groups: Vec::new(),
            level: AuthnLevel::OneFactor,
            keep_me_logged_in: false,
            last_activity: now,
            refresh_at: 0,
            expires_at: now,
        };
        store.save(session.clone()).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.get("expired").unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);

        // Never looked up again, dropped by the next save.
        store.save(session.clone()).unwrap();
        let fresh = UserSession {
            id: String::from("fresh"),
            expires_at: now + 86400,
            ..session
        };
        store.save(fresh).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.get("fresh").unwrap().is_some());
    }

    #[test]
    fn test_cookie() {
        let sessions = mock_sessions();
        let provider = sessions.provider_for_host("example.com").unwrap();

        let mut session = provider.new_session();
        let cookie = provider.cookie(&session);
        assert_eq!(cookie.name(), "authgate_session");
        assert_eq!(cookie.value(), session.id);
        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert!(cookie.max_age().is_none());

        session.keep_me_logged_in = true;
        let cookie = provider.cookie(&session);
        assert_eq!(
            cookie.max_age(),
            Some(CookieDuration::seconds(provider.remember_me.as_secs() as i64))
        );
    }
}
