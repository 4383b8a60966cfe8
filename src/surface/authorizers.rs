use crate::domain::{AuthorizerBinding, RealmKind};
use crate::error::BuildError;

pub const PRODUCTS_AUTHORIZER: &str = "ProductsAuthorizer";
pub const PRODUCTS_ADMIN_AUTHORIZER: &str = "ProductsAdminAuthorizer";
pub const ORDERS_AUTHORIZER: &str = "OrdersAuthorizer";

/// Associate a token-verification policy with one or more realms.
///
/// Overlapping membership across bindings is allowed; the only rule is that
/// a binding names at least one realm.
pub fn build_authorizer(name: &str, realms: &[RealmKind]) -> Result<AuthorizerBinding, BuildError> {
    if realms.is_empty() {
        return Err(BuildError::EmptyAuthorizer(name.to_string()));
    }

    let mut unique = Vec::with_capacity(realms.len());
    for realm in realms {
        if !unique.contains(realm) {
            unique.push(*realm);
        }
    }

    Ok(AuthorizerBinding {
        name: name.to_string(),
        realms: unique,
    })
}
