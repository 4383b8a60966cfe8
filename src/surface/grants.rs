//! Read-only user lookup grants attached after the surface is built.

use serde::Serialize;

use super::ApiSurface;
use crate::domain::{HandlerTargets, RealmKind};

pub const USER_LOOKUP_ACTION: &str = "cognito-idp:AdminGetUser";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub policy_name: String,
    pub realm: RealmKind,
    pub action: String,
    pub resource_arn: String,
    /// Handler names the policy is attached to
    pub principals: Vec<String>,
}

/// Admin realm lookups for the admin-area handlers, customer realm lookups
/// for the orders handler.
pub fn user_lookup_grants(surface: &ApiSurface, handlers: &HandlerTargets) -> Vec<PermissionGrant> {
    let plan = [
        (
            RealmKind::Admin,
            "AdminGetUserPolicy",
            vec![handlers.products_admin.name.clone(), handlers.orders.name.clone()],
        ),
        (
            RealmKind::Customer,
            "CustomerGetUserPolicy",
            vec![handlers.orders.name.clone()],
        ),
    ];

    plan.into_iter()
        .filter_map(|(kind, policy_name, principals)| {
            surface.realm(kind).map(|realm| PermissionGrant {
                policy_name: policy_name.to_string(),
                realm: kind,
                action: USER_LOOKUP_ACTION.to_string(),
                resource_arn: realm.arn.clone(),
                principals,
            })
        })
        .collect()
}

/// Whether `handler` may look up principals of `realm`.
pub fn may_look_up(grants: &[PermissionGrant], handler: &str, realm: RealmKind) -> bool {
    grants
        .iter()
        .any(|g| g.realm == realm && g.principals.iter().any(|p| p == handler))
}
