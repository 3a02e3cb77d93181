use std::net::IpAddr;
use std::sync::Arc;

use actix_web::HttpRequest;
use url::form_urlencoded;

use crate::access::Authorizer;
use crate::session::Sessions;
use crate::users::UserProvider;

pub const HEADER_ACCEPT: &str = "Accept";
pub const HEADER_HOST: &str = "Host";
pub const HEADER_X_FORWARDED_FOR: &str = "X-Forwarded-For";
pub const HEADER_X_REQUESTED_WITH: &str = "X-Requested-With";

/// The collaborators every authorization request is answered with.
pub struct Providers {
    pub authorizer: Arc<dyn Authorizer>,
    pub users: Arc<dyn UserProvider>,
    pub sessions: Arc<Sessions>,
}

/// Borrowed view over one inbound request.
pub struct RequestContext<'a> {
    pub req: &'a HttpRequest,
    pub providers: &'a Providers,
}

impl<'a> RequestContext<'a> {
    pub fn new(req: &'a HttpRequest, providers: &'a Providers) -> Self {
        Self { req, providers }
    }

    /// Trimmed header value; blank or non-ASCII values count as absent.
    pub fn header(&self, name: &str) -> Option<&'a str> {
        let value = self.req.headers().get(name)?.to_str().ok()?.trim();
        if value.is_empty() {
            return None;
        }
        Some(value)
    }

    pub fn query_arg(&self, name: &str) -> Option<String> {
        form_urlencoded::parse(self.req.query_string().as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }

    pub fn method(&self) -> &'a str {
        self.req.method().as_str()
    }

    pub fn is_head(&self) -> bool {
        self.method() == "HEAD"
    }

    pub fn is_xhr(&self) -> bool {
        self.header(HEADER_X_REQUESTED_WITH)
            .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
    }

    /// Whether the caller is a browser that can follow a redirect to the
    /// sign-in portal. A missing `Accept` header accepts anything.
    pub fn accepts_html(&self) -> bool {
        let accept = match self.header(HEADER_ACCEPT) {
            Some(accept) => accept,
            None => return true,
        };

        let mut media_types = accept.split(',').map(|part| {
            let media_type = part.split(';').next().unwrap_or_default();
            media_type.trim().to_ascii_lowercase()
        });
        if media_types.next().is_some_and(|first| first == "*/*" || first == "text/html") {
            return true;
        }
        media_types.any(|media_type| media_type == "text/html")
    }

    /// The caller address, as reported by the proxy when possible.
    pub fn remote_ip(&self) -> Option<IpAddr> {
        if let Some(forwarded) = self.header(HEADER_X_FORWARDED_FOR) {
            let first = forwarded.split(',').next().unwrap_or_default().trim();
            if let Ok(ip) = first.parse() {
                return Some(ip);
            }
        }
        self.req.peer_addr().map(|addr| addr.ip())
    }
}
