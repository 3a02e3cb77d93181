use anyhow::{bail, Context, Result};
use log::debug;

use crate::code;
use crate::context::RequestContext;

use super::{Authn, AuthnLevel, AuthnType};

pub const CHALLENGE: &str = r#"Basic realm="Authorization Required""#;

/// Verify `Basic` credentials carried by `header`.
pub fn authenticate(
    ctx: &RequestContext,
    authn_type: AuthnType,
    header: &str,
    value: &str,
) -> Result<Authn> {
    let (scheme, credentials) = match value.split_once(' ') {
        Some(fields) => fields,
        None => bail!("header {header} expected format '<scheme> <credentials>'"),
    };
    if !scheme.eq_ignore_ascii_case("basic") {
        bail!("header {header} uses unsupported scheme '{scheme}'");
    }

    let decoded = code::base64_decode_string(credentials.trim())
        .with_context(|| format!("decode header {header}"))?;
    let (username, password) = match decoded.split_once(':') {
        Some(fields) => fields,
        None => bail!("header {header} credentials missing the ':' separator"),
    };
    if username.is_empty() || password.is_empty() {
        bail!("header {header} has empty username or password");
    }

    let users = &ctx.providers.users;
    let valid = users
        .check_password(username, password)
        .with_context(|| format!("check password for user '{username}'"))?;
    if !valid {
        bail!("invalid credentials for user '{username}'");
    }

    let details = users
        .get_details(username)
        .with_context(|| format!("get details of user '{username}'"))?;
    debug!(
        "Header {header} authenticated user '{}' with one factor",
        details.username
    );
    Ok(Authn::identified(authn_type, AuthnLevel::OneFactor, details))
}
