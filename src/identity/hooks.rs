//! Identity hooks invoked during a realm's authentication lifecycle
//!
//! - pre-authentication: may veto a sign-in attempt with a reason
//! - post-confirmation: fire-and-forget side effect after verification

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::config::HookConfig;
use crate::domain::RealmKind;

/// Attributes of the principal attempting an identity operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEvent {
    pub realm: RealmKind,
    pub username: String,
    #[serde(default)]
    pub user_attributes: HashMap<String, String>,
}

impl AuthEvent {
    pub fn new(realm: RealmKind, username: &str) -> Self {
        Self {
            realm,
            username: username.to_string(),
            user_attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.user_attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn email(&self) -> Option<&str> {
        self.user_attributes.get("email").map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    Allow,
    Deny { reason: String },
}

impl HookDecision {
    pub fn deny(reason: impl Into<String>) -> Self {
        HookDecision::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, HookDecision::Allow)
    }
}

/// Veto point consulted before a sign-in completes
pub trait PreAuthenticationHook: Send + Sync {
    fn check(&self, event: &AuthEvent) -> HookDecision;
}

/// Side effect run after a principal confirms its registration. Cannot veto.
pub trait PostConfirmationHook: Send + Sync {
    fn on_confirmed(&self, event: &AuthEvent);
}

/// Rejects sign-in for a configured set of email addresses.
#[derive(Debug, Clone)]
pub struct BlocklistPreAuthentication {
    blocked: HashSet<String>,
    reason: String,
}

impl BlocklistPreAuthentication {
    pub fn new(blocked: impl IntoIterator<Item = String>, reason: impl Into<String>) -> Self {
        Self {
            blocked: blocked.into_iter().map(|e| e.to_lowercase()).collect(),
            reason: reason.into(),
        }
    }

    pub fn from_config(config: &HookConfig) -> Self {
        Self::new(config.blocked_emails.iter().cloned(), config.block_reason.clone())
    }
}

impl PreAuthenticationHook for BlocklistPreAuthentication {
    fn check(&self, event: &AuthEvent) -> HookDecision {
        let email = event.email().unwrap_or(&event.username).to_lowercase();
        if self.blocked.contains(&email) {
            warn!(realm = %event.realm, username = %event.username, "Blocked sign-in attempt");
            HookDecision::deny(format!("This user is blocked. Reason: {}", self.reason))
        } else {
            HookDecision::Allow
        }
    }
}

/// Records confirmed registrations in the structured log.
#[derive(Debug, Clone, Default)]
pub struct AuditPostConfirmation;

impl PostConfirmationHook for AuditPostConfirmation {
    fn on_confirmed(&self, event: &AuthEvent) {
        info!(
            realm = %event.realm,
            username = %event.username,
            email = event.email().unwrap_or_default(),
            "Principal confirmed"
        );
    }
}
