//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use ecommerce_api::config::{
    ApiConfig, Config, DeploymentConfig, HandlerConfig, HookConfig, RealmConfig,
    TelemetryConfig, TokenSigningConfig,
};
use ecommerce_api::domain::RealmKind;
use ecommerce_api::gateway::{
    Gateway, HandlerEvent, HandlerRegistry, HandlerResponse, RequestHandler,
};
use ecommerce_api::jwt::{AccessTokenClaims, RealmKeys, RealmTokenIssuer, TOKEN_USE_ACCESS};
use ecommerce_api::server::build_gateway;
use ecommerce_api::surface::handler_targets;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const CUSTOMER_SECRET: &str = "customer-secret-for-integration-tests";
pub const ADMIN_SECRET: &str = "admin-secret-for-integration-tests";
pub const BLOCKED_EMAIL: &str = "blocked@example.com";

pub fn test_config() -> Config {
    Config {
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        deployment: DeploymentConfig {
            account_id: "123456789012".to_string(),
            region: "us-east-1".to_string(),
            tags: BTreeMap::from([("cost".to_string(), "ECommerce".to_string())]),
        },
        api: ApiConfig {
            rest_api_name: "ECommerceApi".to_string(),
        },
        customer_realm: RealmConfig {
            pool_name: "CustomerPool".to_string(),
            domain_prefix: "shop-customer".to_string(),
            token: TokenSigningConfig {
                secret: Some(CUSTOMER_SECRET.to_string()),
                ..Default::default()
            },
        },
        admin_realm: RealmConfig {
            pool_name: "AdminPool".to_string(),
            domain_prefix: "shop-admin".to_string(),
            token: TokenSigningConfig {
                secret: Some(ADMIN_SECRET.to_string()),
                ..Default::default()
            },
        },
        hooks: HookConfig {
            blocked_emails: vec![BLOCKED_EMAIL.to_string()],
            block_reason: "TEST".to_string(),
        },
        handlers: HandlerConfig::default(),
        telemetry: TelemetryConfig::default(),
    }
}

/// Handler that records every event it receives
pub struct RecordingHandler {
    name: String,
    events: Mutex<Vec<HandlerEvent>>,
}

impl RecordingHandler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            events: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn last_event(&self) -> Option<HandlerEvent> {
        self.events.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RequestHandler for RecordingHandler {
    async fn handle(&self, event: HandlerEvent) -> ecommerce_api::Result<HandlerResponse> {
        self.events.lock().unwrap().push(event);
        Ok(HandlerResponse::ok(json!({ "handler": self.name })))
    }
}

/// A gateway whose handlers record their invocations
pub struct TestEdge {
    pub config: Config,
    pub gateway: Gateway,
    handlers: BTreeMap<String, Arc<RecordingHandler>>,
}

impl TestEdge {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let targets = handler_targets(&config);
        let mut handlers = BTreeMap::new();
        let mut registry = HandlerRegistry::new();
        for target in targets.all() {
            let handler = Arc::new(RecordingHandler::new(&target.name));
            registry = registry.register(&target.name, handler.clone());
            handlers.insert(target.name.clone(), handler);
        }

        let gateway = build_gateway(&config, registry).expect("gateway should build");
        Self {
            config,
            gateway,
            handlers,
        }
    }

    pub fn handler(&self, name: &str) -> Arc<RecordingHandler> {
        self.handlers
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("no handler named {}", name))
    }

    pub fn total_calls(&self) -> usize {
        self.handlers.values().map(|h| h.calls()).sum()
    }

    fn issuer(&self, realm: RealmKind) -> RealmTokenIssuer {
        let identity = self
            .gateway
            .surface()
            .realm(realm)
            .expect("realm should exist");
        let secret = match realm {
            RealmKind::Customer => CUSTOMER_SECRET,
            RealmKind::Admin => ADMIN_SECRET,
        };
        RealmTokenIssuer::new(identity, RealmKeys::from_secret(secret))
    }

    /// Access token for one of a realm's registered clients.
    pub fn token(&self, realm: RealmKind, client: &str) -> String {
        self.issuer(realm)
            .issue_access_token(client, "user-1", "shopper@example.com", Some("shopper@example.com"))
            .expect("token should be issued")
    }

    pub fn customer_web_token(&self) -> String {
        self.token(RealmKind::Customer, "customerWebClient")
    }

    pub fn customer_mobile_token(&self) -> String {
        self.token(RealmKind::Customer, "customerMobileClient")
    }

    pub fn admin_web_token(&self) -> String {
        self.token(RealmKind::Admin, "adminWebClient")
    }

    /// Token signed by a realm's key but carrying an arbitrary scope claim.
    pub fn token_with_scope(&self, realm: RealmKind, scope: &str) -> String {
        let identity = self
            .gateway
            .surface()
            .realm(realm)
            .expect("realm should exist");
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: "user-1".to_string(),
            iss: identity.issuer.clone(),
            client_id: "forgedClient".to_string(),
            token_use: TOKEN_USE_ACCESS.to_string(),
            scope: scope.to_string(),
            username: "shopper@example.com".to_string(),
            email: None,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 3600,
        };
        self.issuer(realm)
            .keys()
            .sign(&claims)
            .expect("claims should sign")
    }
}
