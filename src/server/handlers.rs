use actix_web::web::{Bytes, Data};
use actix_web::{HttpRequest, HttpResponse};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::authn::AuthnLevel;
use crate::authz::Authz;
use crate::clock::current_timestamp;
use crate::context::{Providers, RequestContext, HEADER_HOST};
use crate::users;

use super::response::{self, Response};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

/// Credentials posted by the sign-in portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstFactorRequest {
    pub username: String,
    pub password: String,

    #[serde(default)]
    pub keep_me_logged_in: bool,

    /// The URL the user was sent to the portal from; selects the cookie
    /// domain.
    #[serde(default)]
    pub target_url: Option<String>,
}

/// Entry point of every authorization endpoint.
pub async fn authz(
    req: HttpRequest,
    authz: Data<Authz>,
    providers: Data<Providers>,
) -> HttpResponse {
    let ctx = RequestContext::new(&req, &providers);
    authz.handle(&ctx)
}

pub async fn health() -> HttpResponse {
    Response::json(HealthResponse {
        status: String::from("OK"),
    })
    .into()
}

pub async fn first_factor(
    req: HttpRequest,
    body: Bytes,
    providers: Data<Providers>,
) -> HttpResponse {
    let login: FirstFactorRequest = match serde_json::from_slice(&body) {
        Ok(login) => login,
        Err(err) => return Response::bad_request(format!("Invalid body: {err}")).into(),
    };
    if login.username.is_empty() || login.password.is_empty() {
        return Response::bad_request("Username and password are required").into();
    }

    let host = match login.target_url.as_deref() {
        Some(target) => match Url::parse(target) {
            Ok(url) => url.host_str().unwrap_or_default().to_string(),
            Err(err) => {
                return Response::bad_request(format!("Invalid target url: {err}")).into();
            }
        },
        None => {
            let ctx = RequestContext::new(&req, &providers);
            let host = ctx.header(HEADER_HOST).unwrap_or_default();
            host.split(':').next().unwrap_or_default().to_string()
        }
    };
    let provider = match providers.sessions.provider_for_host(&host) {
        Ok(provider) => provider,
        Err(err) => return Response::bad_request(format!("{err:#}")).into(),
    };

    match providers
        .users
        .check_password(&login.username, &login.password)
    {
        Ok(true) => {}
        Ok(false) => {
            warn!("Sign in of user '{}' failed: wrong password", login.username);
            return Response::unauthenticated(response::AUTHN_ERROR).into();
        }
        Err(err) if users::is_not_found(&err) => {
            warn!("Sign in of user '{}' failed: {err:#}", login.username);
            return Response::unauthenticated(response::AUTHN_ERROR).into();
        }
        Err(err) => {
            error!("Check password of user '{}': {err:#}", login.username);
            return Response::error(response::USERS_ERROR).into();
        }
    }
    let details = match providers.users.get_details(&login.username) {
        Ok(details) => details,
        Err(err) => {
            error!("Get details of user '{}': {err:#}", login.username);
            return Response::error(response::USERS_ERROR).into();
        }
    };

    if let Err(err) = provider.destroy_session(&req) {
        error!("Destroy previous session: {err:#}");
        return Response::error(response::SESSION_ERROR).into();
    }

    let mut session = provider.new_session();
    let now = current_timestamp();
    let expiration = if login.keep_me_logged_in {
        provider.remember_me
    } else {
        provider.expiration
    };
    session.username = details.username;
    session.display_name = details.display_name;
    session.emails = details.emails;
    session.groups = details.groups;
    session.level = AuthnLevel::OneFactor;
    session.keep_me_logged_in = login.keep_me_logged_in;
    session.expires_at = now + expiration.as_secs();
    if let Err(err) = provider.save_session(&session) {
        error!("Save session of user '{}': {err:#}", session.username);
        return Response::error(response::SESSION_ERROR).into();
    }

    info!(
        "User '{}' signed in with one factor for domain '{}'",
        session.username, provider.domain
    );
    Response::ok().with_cookie(provider.cookie(&session)).into()
}

pub async fn default_handler(req: HttpRequest) -> HttpResponse {
    Response::not_found(format!(
        "No handler for {} '{}'",
        req.method(),
        req.path()
    ))
    .into()
}
