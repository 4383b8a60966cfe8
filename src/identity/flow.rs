//! Principal lifecycle of a realm: sign-up, confirmation, sign-in, invitation

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

use super::hooks::{
    AuditPostConfirmation, AuthEvent, BlocklistPreAuthentication, HookDecision,
    PostConfirmationHook, PreAuthenticationHook,
};
use crate::config::HookConfig;
use crate::domain::{IdentityRealm, SignUpPolicy};
use crate::error::{AppError, Result};

/// Self-service registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Administrator invitation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpOutcome {
    pub username: String,
    pub confirmed: bool,
    /// Masked address the verification code was delivered to
    pub delivery_destination: String,
    pub delivery_subject: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub username: String,
    #[serde(skip_serializing)]
    pub temporary_password: String,
    pub expires_at: DateTime<Utc>,
    pub subject: String,
    #[serde(skip_serializing)]
    pub message: String,
}

/// A realm together with the hook implementations bound to its triggers
pub struct RealmFlow<'a> {
    realm: &'a IdentityRealm,
    pre_authentication: Vec<Arc<dyn PreAuthenticationHook>>,
    post_confirmation: Vec<Arc<dyn PostConfirmationHook>>,
}

impl<'a> RealmFlow<'a> {
    /// A flow with no hooks bound.
    pub fn new(realm: &'a IdentityRealm) -> Self {
        Self {
            realm,
            pre_authentication: vec![],
            post_confirmation: vec![],
        }
    }

    /// Bind the stock hooks to whichever triggers the realm declares.
    pub fn with_declared_hooks(realm: &'a IdentityRealm, config: &HookConfig) -> Self {
        let mut flow = Self::new(realm);
        if realm.spec.triggers.pre_authentication.is_some() {
            flow = flow.with_pre_authentication(Arc::new(BlocklistPreAuthentication::from_config(
                config,
            )));
        }
        if realm.spec.triggers.post_confirmation.is_some() {
            flow = flow.with_post_confirmation(Arc::new(AuditPostConfirmation));
        }
        flow
    }

    pub fn with_pre_authentication(mut self, hook: Arc<dyn PreAuthenticationHook>) -> Self {
        self.pre_authentication.push(hook);
        self
    }

    pub fn with_post_confirmation(mut self, hook: Arc<dyn PostConfirmationHook>) -> Self {
        self.post_confirmation.push(hook);
        self
    }

    pub fn realm(&self) -> &IdentityRealm {
        self.realm
    }

    /// Register a principal. Only realms with self-service sign-up accept this.
    pub fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome> {
        let verification = match &self.realm.spec.sign_up {
            SignUpPolicy::SelfService { verification, .. } => verification,
            SignUpPolicy::InvitationOnly { .. } => {
                return Err(AppError::SignUpDisabled(self.realm.name().to_string()));
            }
        };

        request.validate()?;
        self.check_required_attributes(&request.email, &request.attributes)?;

        if let Err(errors) = self.realm.password_policy().validate_password(&request.password) {
            return Err(AppError::BadRequest(errors.join("; ")));
        }

        debug!(realm = %self.realm.kind, "Sign-up accepted, verification pending");
        Ok(SignUpOutcome {
            username: request.email.clone(),
            confirmed: false,
            delivery_destination: mask_email(&request.email),
            delivery_subject: verification.email_subject.clone(),
        })
    }

    /// Complete verification and run post-confirmation hooks.
    pub fn confirm_sign_up(&self, event: &AuthEvent) {
        for hook in &self.post_confirmation {
            hook.on_confirmed(event);
        }
    }

    /// Run pre-authentication hooks. The first denial aborts the sign-in.
    pub fn authenticate(&self, event: &AuthEvent) -> Result<()> {
        for hook in &self.pre_authentication {
            if let HookDecision::Deny { reason } = hook.check(event) {
                info!(realm = %self.realm.kind, username = %event.username, "Sign-in denied by hook");
                return Err(AppError::HookDenied(reason));
            }
        }
        Ok(())
    }

    /// Create a principal on behalf of an administrator.
    pub fn invite(&self, request: &InviteRequest) -> Result<Invitation> {
        let invitation = self.realm.spec.sign_up.invitation().ok_or_else(|| {
            AppError::BadRequest(format!(
                "Realm '{}' does not send invitations",
                self.realm.name()
            ))
        })?;

        request.validate()?;
        self.check_required_attributes(&request.email, &request.attributes)?;

        let policy = self.realm.password_policy();
        let temporary_password = generate_temporary_password(policy.min_length.max(12) as usize);
        let message = invitation.render(&request.email, &temporary_password);

        Ok(Invitation {
            username: request.email.clone(),
            temporary_password,
            expires_at: Utc::now() + policy.temp_password_validity(),
            subject: invitation.email_subject.clone(),
            message,
        })
    }

    fn check_required_attributes(
        &self,
        email: &str,
        attributes: &HashMap<String, String>,
    ) -> Result<()> {
        let missing: Vec<&str> = self
            .realm
            .required_attributes()
            .filter(|name| match *name {
                "email" => email.is_empty(),
                other => attributes.get(other).map_or(true, |v| v.trim().is_empty()),
            })
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Missing required attributes: [{}]",
                missing.join(", ")
            )))
        }
    }
}

fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}

/// Generate a temporary password containing every character class
fn generate_temporary_password(length: usize) -> String {
    const CHARSET_LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
    const CHARSET_UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    const CHARSET_DIGIT: &[u8] = b"23456789";
    const CHARSET_SPECIAL: &[u8] = b"!@#$%^&*";

    let mut rng = rand::thread_rng();

    let mut password: Vec<char> = Vec::with_capacity(length);
    password.push(CHARSET_LOWER[rng.gen_range(0..CHARSET_LOWER.len())] as char);
    password.push(CHARSET_UPPER[rng.gen_range(0..CHARSET_UPPER.len())] as char);
    password.push(CHARSET_DIGIT[rng.gen_range(0..CHARSET_DIGIT.len())] as char);
    password.push(CHARSET_SPECIAL[rng.gen_range(0..CHARSET_SPECIAL.len())] as char);

    let all_chars: Vec<u8> =
        [CHARSET_LOWER, CHARSET_UPPER, CHARSET_DIGIT, CHARSET_SPECIAL].concat();
    while password.len() < length {
        password.push(all_chars[rng.gen_range(0..all_chars.len())] as char);
    }

    password.shuffle(&mut rng);
    password.into_iter().collect()
}
