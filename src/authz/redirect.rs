use actix_web::http::StatusCode;
use anyhow::{bail, Context, Result};
use url::Url;

use super::object::Object;

const QUERY_TARGET: &str = "rd";
const QUERY_METHOD: &str = "rm";

/// The portal URL with the target URL in `rd` and its method in `rm`.
pub fn redirection_url(object: &Object, portal: &Url) -> Url {
    let mut pairs = portal
        .query_pairs()
        .filter(|(key, _)| key != QUERY_TARGET && key != QUERY_METHOD)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect::<Vec<_>>();
    pairs.push((QUERY_TARGET.to_string(), object.url.to_string()));
    if !object.method.is_empty() {
        pairs.push((QUERY_METHOD.to_string(), object.method.clone()));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut url = portal.clone();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url
}

/// Requests that browsers safely repeat after a redirect get 302, the
/// others 303 so the portal is fetched with GET.
pub fn redirect_status(method: &str) -> StatusCode {
    match method {
        "GET" | "HEAD" | "OPTIONS" | "" => StatusCode::FOUND,
        _ => StatusCode::SEE_OTHER,
    }
}

/// Parse a portal URL supplied by the proxy.
pub fn parse_portal_url(source: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("parse portal url from {source}"))?;
    if url.scheme() != "https" {
        bail!("portal url '{raw}' from {source} must use the https scheme");
    }
    if url.host_str().map_or(true, str::is_empty) {
        bail!("portal url '{raw}' from {source} has no host");
    }
    Ok(url)
}
