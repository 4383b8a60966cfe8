//! Identity realms
//!
//! This module defines the two fixed realm specifications (customer and
//! admin) and builds provisioned [`IdentityRealm`]s from them, deriving the
//! durable pool identifier, ARN, token issuer and hosted domain.

pub mod flow;
pub mod hooks;

use tracing::info;
use uuid::Uuid;

use crate::config::{Config, DeploymentConfig, RealmConfig};
use crate::domain::{
    AccountRecovery, ClientConfig, HandlerTarget, IdentityRealm, InvitationMessage,
    PasswordPolicy, RealmId, RealmKind, RealmSpec, RealmTriggers, ResourceServer,
    ScopeDefinition, ScopeRef, SignInAlias, SignUpPolicy, StandardAttribute, VerificationFlow,
    VerificationStyle,
};
use crate::error::BuildError;

pub use flow::{Invitation, InviteRequest, RealmFlow, SignUpOutcome, SignUpRequest};
pub use hooks::{
    AuditPostConfirmation, AuthEvent, BlocklistPreAuthentication, HookDecision,
    PostConfirmationHook, PreAuthenticationHook,
};

const CUSTOMER_RESOURCE_SERVER: &str = "customer";
const ADMIN_RESOURCE_SERVER: &str = "admin";

const VERIFICATION_SUBJECT: &str = "Verify your email for the ECommerce service!";
const VERIFICATION_BODY: &str =
    "Thanks for signup to ECommerce service! Your verification code is {####}";
const INVITATION_SUBJECT: &str = "Welcome to ECommerce administrator service";
const INVITATION_BODY: &str = "Your username is {username} and temporary password is {####}";

/// Function names of the identity hooks attached to the customer realm
pub const PRE_AUTHENTICATION_FUNCTION: &str = "PreAuthenticationFunction";
pub const POST_CONFIRMATION_FUNCTION: &str = "PostConfirmationFunction";

/// Specs for both realms. Both are mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmSpecs {
    pub customer: RealmSpec,
    pub admin: RealmSpec,
}

impl RealmSpecs {
    pub fn from_config(config: &Config) -> Self {
        Self {
            customer: customer_realm_spec(&config.customer_realm, &config.deployment),
            admin: admin_realm_spec(&config.admin_realm),
        }
    }
}

/// Customer realm: self-service sign-up with an emailed code, web and mobile clients.
pub fn customer_realm_spec(config: &RealmConfig, deployment: &DeploymentConfig) -> RealmSpec {
    let web = ScopeRef::new(CUSTOMER_RESOURCE_SERVER, "web");
    let mobile = ScopeRef::new(CUSTOMER_RESOURCE_SERVER, "mobile");

    RealmSpec {
        pool_name: config.pool_name.clone(),
        domain_prefix: config.domain_prefix.clone(),
        sign_up: SignUpPolicy::SelfService {
            verification: VerificationFlow {
                email_subject: VERIFICATION_SUBJECT.to_string(),
                email_body: VERIFICATION_BODY.to_string(),
                style: VerificationStyle::Code,
                auto_verify_email: true,
            },
            invitation: None,
        },
        sign_in_aliases: vec![SignInAlias::Email],
        standard_attributes: vec![StandardAttribute::required_immutable("name")],
        password_policy: PasswordPolicy::default(),
        account_recovery: AccountRecovery::EmailOnly,
        resource_server: ResourceServer {
            identifier: CUSTOMER_RESOURCE_SERVER.to_string(),
            name: "CustomerResourceServer".to_string(),
            scopes: vec![
                ScopeDefinition {
                    name: web.name.clone(),
                    description: "Customer Web operation".to_string(),
                },
                ScopeDefinition {
                    name: mobile.name.clone(),
                    description: "Customer Mobile operation".to_string(),
                },
            ],
        },
        clients: vec![
            ClientConfig::user_password("customerWebClient", web),
            ClientConfig::user_password("customerMobileClient", mobile),
        ],
        triggers: RealmTriggers {
            pre_authentication: Some(HandlerTarget::lambda(
                "preAuthenticationHandler",
                PRE_AUTHENTICATION_FUNCTION,
                &deployment.region,
                &deployment.account_id,
            )),
            post_confirmation: Some(HandlerTarget::lambda(
                "postConfirmationHandler",
                POST_CONFIRMATION_FUNCTION,
                &deployment.region,
                &deployment.account_id,
            )),
        },
    }
}

/// Admin realm: invitation only, a single web client.
pub fn admin_realm_spec(config: &RealmConfig) -> RealmSpec {
    let web = ScopeRef::new(ADMIN_RESOURCE_SERVER, "web");

    RealmSpec {
        pool_name: config.pool_name.clone(),
        domain_prefix: config.domain_prefix.clone(),
        sign_up: SignUpPolicy::InvitationOnly {
            invitation: InvitationMessage {
                email_subject: INVITATION_SUBJECT.to_string(),
                email_body: INVITATION_BODY.to_string(),
            },
        },
        sign_in_aliases: vec![SignInAlias::Email],
        standard_attributes: vec![StandardAttribute::required_immutable("email")],
        password_policy: PasswordPolicy::default(),
        account_recovery: AccountRecovery::EmailOnly,
        resource_server: ResourceServer {
            identifier: ADMIN_RESOURCE_SERVER.to_string(),
            name: "AdminResourceServer".to_string(),
            scopes: vec![ScopeDefinition {
                name: web.name.clone(),
                description: "Admin Web operation".to_string(),
            }],
        },
        clients: vec![ClientConfig::user_password("adminWebClient", web)],
        triggers: RealmTriggers::default(),
    }
}

/// Provision a realm from its spec.
///
/// Every client must request a scope declared by the realm's own resource
/// server.
pub fn build_realm(
    kind: RealmKind,
    spec: RealmSpec,
    deployment: &DeploymentConfig,
) -> Result<IdentityRealm, BuildError> {
    for client in &spec.clients {
        if !spec.resource_server.declares(&client.scope) {
            return Err(BuildError::InvalidClientScope {
                realm: spec.pool_name.clone(),
                client: client.name.clone(),
                scope: client.scope.to_string(),
            });
        }
    }

    let region = &deployment.region;
    let account_id = &deployment.account_id;

    let id = RealmId(Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("cognito-idp:{}:{}:{}", region, account_id, spec.pool_name).as_bytes(),
    ));
    let suffix: String = id.0.simple().to_string().chars().take(9).collect();
    let pool_id = format!("{}_{}", region, suffix);

    let realm = IdentityRealm {
        kind,
        id,
        arn: format!(
            "arn:aws:cognito-idp:{}:{}:userpool/{}",
            region, account_id, pool_id
        ),
        issuer: format!("https://cognito-idp.{}.amazonaws.com/{}", region, pool_id),
        domain: format!(
            "https://{}.auth.{}.amazoncognito.com",
            spec.domain_prefix, region
        ),
        pool_id,
        spec,
    };

    info!(
        realm = %realm.kind,
        pool_id = %realm.pool_id,
        clients = realm.clients().len(),
        "Built identity realm"
    );
    Ok(realm)
}
