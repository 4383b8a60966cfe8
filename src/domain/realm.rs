//! Identity realm domain models

use super::method::HandlerTarget;
use super::password::PasswordPolicy;
use super::scope::ScopeRef;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Access-token validity shared by every client of every realm.
pub const ACCESS_TOKEN_VALIDITY_MINUTES: u32 = 60;
/// Refresh-token validity shared by every client of every realm.
pub const REFRESH_TOKEN_VALIDITY_DAYS: u32 = 7;

/// The two realms that exist for the life of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealmKind {
    Customer,
    Admin,
}

impl RealmKind {
    pub fn all() -> [RealmKind; 2] {
        [RealmKind::Customer, RealmKind::Admin]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RealmKind::Customer => "customer",
            RealmKind::Admin => "admin",
        }
    }
}

impl fmt::Display for RealmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable realm identifier, stable across builds of the same deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RealmId(pub Uuid);

impl fmt::Display for RealmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidity {
    pub access_token_minutes: u32,
    pub refresh_token_days: u32,
}

impl Default for TokenValidity {
    fn default() -> Self {
        Self {
            access_token_minutes: ACCESS_TOKEN_VALIDITY_MINUTES,
            refresh_token_days: REFRESH_TOKEN_VALIDITY_DAYS,
        }
    }
}

impl TokenValidity {
    pub fn access(&self) -> Duration {
        Duration::minutes(i64::from(self.access_token_minutes))
    }

    pub fn refresh(&self) -> Duration {
        Duration::days(i64::from(self.refresh_token_days))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInAlias {
    Email,
    Username,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStyle {
    Code,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRecovery {
    EmailOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardAttribute {
    /// Standard attribute name (`email`, `name`, ...)
    pub name: String,
    pub required: bool,
    pub mutable: bool,
}

impl StandardAttribute {
    pub fn required_immutable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
            mutable: false,
        }
    }
}

/// Message delivered when a self-registered principal must verify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFlow {
    pub email_subject: String,
    /// Body template; `{####}` is replaced by the code
    pub email_body: String,
    pub style: VerificationStyle,
    pub auto_verify_email: bool,
}

/// Message delivered when an administrator invites a principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationMessage {
    pub email_subject: String,
    /// Body template; `{username}` and `{####}` (temporary password) are replaced
    pub email_body: String,
}

impl InvitationMessage {
    pub fn render(&self, username: &str, temporary_password: &str) -> String {
        self.email_body
            .replace("{username}", username)
            .replace("{####}", temporary_password)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SignUpPolicy {
    /// Principals register themselves and verify through `verification`
    SelfService {
        verification: VerificationFlow,
        #[serde(skip_serializing_if = "Option::is_none")]
        invitation: Option<InvitationMessage>,
    },
    /// Principals exist only after an administrator invites them
    InvitationOnly { invitation: InvitationMessage },
}

impl SignUpPolicy {
    pub fn allows_self_sign_up(&self) -> bool {
        matches!(self, SignUpPolicy::SelfService { .. })
    }

    pub fn invitation(&self) -> Option<&InvitationMessage> {
        match self {
            SignUpPolicy::SelfService { invitation, .. } => invitation.as_ref(),
            SignUpPolicy::InvitationOnly { invitation } => Some(invitation),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDefinition {
    pub name: String,
    pub description: String,
}

/// OAuth resource server bound to exactly one realm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceServer {
    /// Identifier used as the scope namespace (`customer`, `admin`)
    pub identifier: String,
    pub name: String,
    pub scopes: Vec<ScopeDefinition>,
}

impl ResourceServer {
    pub fn declares(&self, scope: &ScopeRef) -> bool {
        scope.resource_server == self.identifier && self.scopes.iter().any(|s| s.name == scope.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFlow {
    UserPassword,
}

/// An application client of a realm. Requests exactly one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub name: String,
    pub auth_flows: Vec<AuthFlow>,
    pub scope: ScopeRef,
    pub token_validity: TokenValidity,
}

impl ClientConfig {
    pub fn user_password(name: &str, scope: ScopeRef) -> Self {
        Self {
            name: name.to_string(),
            auth_flows: vec![AuthFlow::UserPassword],
            scope,
            token_validity: TokenValidity::default(),
        }
    }
}

/// Identity hooks registered on a realm
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmTriggers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_authentication: Option<HandlerTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_confirmation: Option<HandlerTarget>,
}

/// Desired state of one realm, before identifiers are assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmSpec {
    pub pool_name: String,
    pub domain_prefix: String,
    pub sign_up: SignUpPolicy,
    pub sign_in_aliases: Vec<SignInAlias>,
    pub standard_attributes: Vec<StandardAttribute>,
    pub password_policy: PasswordPolicy,
    pub account_recovery: AccountRecovery,
    pub resource_server: ResourceServer,
    pub clients: Vec<ClientConfig>,
    pub triggers: RealmTriggers,
}

/// A provisioned realm: its spec plus the identifiers derived for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRealm {
    pub kind: RealmKind,
    pub id: RealmId,
    /// External pool handle (`<region>_<suffix>`)
    pub pool_id: String,
    pub arn: String,
    /// Token issuer URL
    pub issuer: String,
    /// Hosted sign-in domain
    pub domain: String,
    #[serde(flatten)]
    pub spec: RealmSpec,
}

impl IdentityRealm {
    pub fn name(&self) -> &str {
        &self.spec.pool_name
    }

    pub fn resource_server(&self) -> &ResourceServer {
        &self.spec.resource_server
    }

    pub fn clients(&self) -> &[ClientConfig] {
        &self.spec.clients
    }

    pub fn client(&self, name: &str) -> Option<&ClientConfig> {
        self.spec.clients.iter().find(|c| c.name == name)
    }

    pub fn password_policy(&self) -> &PasswordPolicy {
        &self.spec.password_policy
    }

    pub fn allows_self_sign_up(&self) -> bool {
        self.spec.sign_up.allows_self_sign_up()
    }

    pub fn required_attributes(&self) -> impl Iterator<Item = &str> {
        self.spec
            .standard_attributes
            .iter()
            .filter(|a| a.required)
            .map(|a| a.name.as_str())
    }

    /// Whether `scope` is namespaced under this realm's resource server.
    pub fn owns_scope(&self, scope: &ScopeRef) -> bool {
        scope.resource_server == self.spec.resource_server.identifier
    }
}
