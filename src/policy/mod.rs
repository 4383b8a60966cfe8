//! Scope enforcement for bound methods.

use crate::domain::{AuthorizerBinding, ScopeLattice, ScopeRef};
use crate::error::AppError;
use crate::jwt::VerifiedToken;

pub type PolicyResult<T> = std::result::Result<T, AppError>;

/// Check a verified token against a method's authorizer and allowed scopes.
///
/// Returns the first allowed scope the token carries. A scope claim only
/// counts when its resource-server identifier belongs to the realm that
/// issued the token, so a customer token listing `admin/web` grants nothing.
pub fn authorize(
    binding: &AuthorizerBinding,
    allowed_scopes: &[ScopeRef],
    token: &VerifiedToken,
    lattice: &ScopeLattice,
) -> PolicyResult<ScopeRef> {
    if !binding.accepts(token.realm) {
        return Err(AppError::Unauthorized(format!(
            "Tokens from realm '{}' are not accepted by {}",
            token.realm, binding.name
        )));
    }

    token
        .scopes
        .iter()
        .filter_map(|raw| ScopeRef::parse(raw).ok())
        .filter(|scope| lattice.realm_of(&scope.resource_server) == Some(token.realm))
        .find(|scope| allowed_scopes.contains(scope))
        .ok_or_else(|| {
            AppError::Forbidden(format!(
                "Token carries none of the allowed scopes: [{}]",
                allowed_scopes
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}
