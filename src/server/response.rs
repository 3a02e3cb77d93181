use actix_web::cookie::Cookie;
use actix_web::http::header::{ContentType, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, HttpResponseBuilder};
use log::warn;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::code;

pub const HEADER_LOCATION: &str = "Location";
pub const HEADER_REMOTE_USER: &str = "Remote-User";
pub const HEADER_REMOTE_GROUPS: &str = "Remote-Groups";
pub const HEADER_REMOTE_NAME: &str = "Remote-Name";
pub const HEADER_REMOTE_EMAIL: &str = "Remote-Email";

pub const AUTHN_ERROR: &str = "Authentication failed";
pub const SESSION_ERROR: &str = "Session error";
pub const USERS_ERROR: &str = "User provider error";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommonResponse {
    pub code: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Identity passed to the protected application on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteIdentity {
    pub user: String,
    pub groups: Vec<String>,
    pub name: String,
    pub email: String,
}

/// A wrapper struct for HTTP responses that provides convenient methods
/// for creating common response types
pub struct Response {
    http_response: HttpResponse,
}

impl Response {
    /// Status-only reply with a `text/plain` body such as `403 Forbidden`.
    pub fn status(status: StatusCode) -> Self {
        Self {
            http_response: HttpResponseBuilder::new(status)
                .content_type(ContentType::plaintext())
                .body(Self::status_text(status)),
        }
    }

    pub fn challenge(status: StatusCode, header: &str, value: &str) -> Self {
        Self {
            http_response: HttpResponseBuilder::new(status)
                .insert_header((header, value))
                .content_type(ContentType::plaintext())
                .body(Self::status_text(status)),
        }
    }

    /// Redirect to `location`, with a short HTML body unless the request
    /// cannot carry one.
    pub fn redirect(status: StatusCode, location: &Url, with_body: bool) -> Self {
        let mut resp = HttpResponseBuilder::new(status);
        resp.insert_header((HEADER_LOCATION, location.as_str()));
        if !with_body {
            return Self {
                http_response: resp.finish(),
            };
        }

        let body = format!(
            "<a href=\"{}\">{}</a>",
            code::html_escape(location.as_str()),
            Self::status_text(status)
        );
        Self {
            http_response: resp.content_type(ContentType::html()).body(body),
        }
    }

    pub fn authorized(identity: Option<RemoteIdentity>) -> Self {
        let mut resp = HttpResponse::Ok();
        if let Some(identity) = identity {
            resp.insert_header((HEADER_REMOTE_USER, Self::header_value(&identity.user)))
                .insert_header((
                    HEADER_REMOTE_GROUPS,
                    Self::header_value(&identity.groups.join(",")),
                ))
                .insert_header((HEADER_REMOTE_NAME, Self::header_value(&identity.name)))
                .insert_header((HEADER_REMOTE_EMAIL, Self::header_value(&identity.email)));
        }
        Self {
            http_response: resp
                .content_type(ContentType::plaintext())
                .body(Self::status_text(StatusCode::OK)),
        }
    }

    pub fn bad_request(message: impl AsRef<str>) -> Self {
        let message = format!("Bad request: {}", message.as_ref());
        Self::err_response(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthenticated(message: impl AsRef<str>) -> Self {
        let message = format!("Unauthenticated: {}", message.as_ref());
        Self::err_response(StatusCode::UNAUTHORIZED, message)
    }

    pub fn error(message: &str) -> Self {
        let message = format!("Server error: {message}");
        Self::err_response(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn not_found(message: String) -> Self {
        Self::err_response(StatusCode::NOT_FOUND, message)
    }

    pub fn ok() -> Self {
        let resp = CommonResponse {
            code: StatusCode::OK.into(),
            message: None,
        };
        Self {
            http_response: HttpResponse::Ok().json(resp),
        }
    }

    pub fn json<T: Serialize>(data: T) -> Self {
        Self {
            http_response: HttpResponse::Ok().json(data),
        }
    }

    pub fn with_cookie(mut self, cookie: Cookie<'_>) -> Self {
        if let Err(err) = self.http_response.add_cookie(&cookie) {
            warn!("Add cookie '{}' to response: {err}", cookie.name());
        }
        self
    }

    fn err_response(status: StatusCode, message: String) -> Self {
        let resp = CommonResponse {
            code: status.into(),
            message: Some(message),
        };
        Self {
            http_response: HttpResponseBuilder::new(status).json(resp),
        }
    }

    /// Profile values may hold non-ASCII text, which is sent as raw bytes.
    fn header_value(value: &str) -> HeaderValue {
        HeaderValue::from_bytes(value.as_bytes()).unwrap_or(HeaderValue::from_static(""))
    }

    fn status_text(status: StatusCode) -> String {
        format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        )
    }
}

impl From<Response> for HttpResponse {
    fn from(val: Response) -> Self {
        val.http_response
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::MessageBody;

    use super::*;

    fn body_string(resp: HttpResponse) -> String {
        let body = resp.into_body().try_into_bytes().unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[test]
    fn test_status() {
        let resp: HttpResponse = Response::status(StatusCode::FORBIDDEN).into();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(resp), "403 Forbidden");

        let resp: HttpResponse =
            Response::challenge(StatusCode::PROXY_AUTHENTICATION_REQUIRED, "Proxy-Authenticate", "Basic").into();
        assert_eq!(resp.headers().get("Proxy-Authenticate").unwrap(), "Basic");
        assert_eq!(body_string(resp), "407 Proxy Authentication Required");
    }

    #[test]
    fn test_redirect() {
        let location = Url::parse("https://auth.example.com/?rd=x&rm=GET").unwrap();
        let resp: HttpResponse = Response::redirect(StatusCode::FOUND, &location, true).into();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(HEADER_LOCATION).unwrap(),
            "https://auth.example.com/?rd=x&rm=GET"
        );
        assert_eq!(
            body_string(resp),
            "<a href=\"https://auth.example.com/?rd=x&amp;rm=GET\">302 Found</a>"
        );

        let resp: HttpResponse = Response::redirect(StatusCode::SEE_OTHER, &location, false).into();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert!(resp.headers().get(HEADER_LOCATION).is_some());
        assert!(body_string(resp).is_empty());
    }

    #[test]
    fn test_authorized() {
        let identity = RemoteIdentity {
            user: String::from("john"),
            groups: vec![String::from("admins"), String::from("dev")],
            name: String::from("John Doe"),
            email: String::new(),
        };
        let resp: HttpResponse = Response::authorized(Some(identity)).into();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(HEADER_REMOTE_USER).unwrap(), "john");
        assert_eq!(resp.headers().get(HEADER_REMOTE_GROUPS).unwrap(), "admins,dev");
        assert_eq!(resp.headers().get(HEADER_REMOTE_NAME).unwrap(), "John Doe");
        assert_eq!(resp.headers().get(HEADER_REMOTE_EMAIL).unwrap(), "");

        let identity = RemoteIdentity {
            user: String::from("jörg"),
            ..Default::default()
        };
        let resp: HttpResponse = Response::authorized(Some(identity)).into();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(HEADER_REMOTE_USER).unwrap().as_bytes(),
            "jörg".as_bytes()
        );

        let resp: HttpResponse = Response::authorized(None).into();
        assert!(resp.headers().get(HEADER_REMOTE_USER).is_none());
        assert_eq!(body_string(resp), "200 OK");
    }
}
