//! Handler targets, authorizer bindings and method bindings

use super::realm::RealmKind;
use super::resource::ResourceId;
use super::schema::{QueryParameter, ValidatorId};
use super::scope::ScopeRef;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Patch => "PATCH",
        }
    }

    /// Method tokens are case-sensitive: `get` is not `GET`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(HttpVerb::Get),
            "POST" => Some(HttpVerb::Post),
            "PUT" => Some(HttpVerb::Put),
            "DELETE" => Some(HttpVerb::Delete),
            "PATCH" => Some(HttpVerb::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An externally provisioned function invoked by a method or identity hook
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerTarget {
    /// Logical name (`ordersHandler`)
    pub name: String,
    pub function_name: String,
    pub function_arn: String,
}

impl HandlerTarget {
    pub fn lambda(name: &str, function_name: &str, region: &str, account_id: &str) -> Self {
        Self {
            name: name.to_string(),
            function_name: function_name.to_string(),
            function_arn: format!(
                "arn:aws:lambda:{}:{}:function:{}",
                region, account_id, function_name
            ),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.name.is_empty() && !self.function_name.is_empty() && !self.function_arn.is_empty()
    }
}

/// The handler targets the surface binds. All must exist before the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerTargets {
    pub products_fetch: HandlerTarget,
    pub products_admin: HandlerTarget,
    pub orders: HandlerTarget,
    pub order_events_fetch: HandlerTarget,
}

impl HandlerTargets {
    pub fn all(&self) -> [&HandlerTarget; 4] {
        [
            &self.products_fetch,
            &self.products_admin,
            &self.orders,
            &self.order_events_fetch,
        ]
    }
}

/// Handle to an authorizer registered on a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AuthorizerId(pub usize);

/// Token-verification policy over one or more realms. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizerBinding {
    pub name: String,
    pub realms: Vec<RealmKind>,
}

impl AuthorizerBinding {
    pub fn accepts(&self, realm: RealmKind) -> bool {
        self.realms.contains(&realm)
    }
}

/// Authorization requested for a method: which authorizer, which scopes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationOptions<'a> {
    pub authorizer: AuthorizerId,
    pub scopes: &'a [&'a str],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodAuthorization {
    pub authorizer: AuthorizerId,
    pub allowed_scopes: Vec<ScopeRef>,
}

/// One (resource, verb) pair wired to its handler, authorization and validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodBinding {
    pub resource: ResourceId,
    pub path: String,
    pub verb: HttpVerb,
    pub handler: HandlerTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<MethodAuthorization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<ValidatorId>,
    /// Documented query parameters; enforced only through `validator`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query_parameters: Vec<QueryParameter>,
}

impl MethodBinding {
    pub fn allowed_scopes(&self) -> &[ScopeRef] {
        self.authorization
            .as_ref()
            .map(|a| a.allowed_scopes.as_slice())
            .unwrap_or(&[])
    }
}
