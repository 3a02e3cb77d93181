use crate::access::Level;
use crate::authn::AuthnLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzResult {
    Forbidden,
    Unauthorized,
    Authorized,
}

/// Decide a request from the caller's authentication level, the level the
/// matched rule requires, and whether that rule names explicit subjects.
///
/// An anonymous caller denied by a subject-bearing rule is not forbidden:
/// after signing in they might be someone the rule does not deny.
pub fn authz_result(level: AuthnLevel, required: Level, has_subject: bool) -> AuthzResult {
    match required {
        Level::Bypass => AuthzResult::Authorized,
        Level::Denied if level != AuthnLevel::NotAuthenticated || !has_subject => {
            AuthzResult::Forbidden
        }
        Level::OneFactor if level >= AuthnLevel::OneFactor => AuthzResult::Authorized,
        Level::TwoFactor if level >= AuthnLevel::TwoFactor => AuthzResult::Authorized,
        _ => AuthzResult::Unauthorized,
    }
}
