//! Configuration management for the ECommerce API surface
//!
//! Every deployment-specific value (account, region, tags, domain prefixes,
//! pool names) is injected here instead of living in the builders.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::env;

lazy_static! {
    static ref ACCOUNT_ID_REGEX: Regex = Regex::new(r"^\d{12}$").unwrap();
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Local edge HTTP host
    pub http_host: String,
    /// Local edge HTTP port
    pub http_port: u16,
    /// Target account/region and stack tags
    pub deployment: DeploymentConfig,
    /// REST API settings
    pub api: ApiConfig,
    /// Customer realm settings
    pub customer_realm: RealmConfig,
    /// Admin realm settings
    pub admin_realm: RealmConfig,
    /// Identity hook settings
    pub hooks: HookConfig,
    /// Names of the externally provisioned handler functions
    pub handlers: HandlerConfig,
    /// Logging and metrics
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub account_id: String,
    pub region: String,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub rest_api_name: String,
}

#[derive(Debug, Clone)]
pub struct RealmConfig {
    pub pool_name: String,
    pub domain_prefix: String,
    pub token: TokenSigningConfig,
}

/// Key material the local edge uses to sign and verify a realm's tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenSigningConfig {
    pub secret: Option<String>,
    pub private_key_pem: Option<String>,
    pub public_key_pem: Option<String>,
}

impl TokenSigningConfig {
    pub fn is_configured(&self) -> bool {
        self.secret.is_some() || self.private_key_pem.is_some() || self.public_key_pem.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct HookConfig {
    /// Emails the pre-authentication hook rejects (compared case-insensitively)
    pub blocked_emails: Vec<String>,
    pub block_reason: String,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            blocked_emails: vec![],
            block_reason: "TEST".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub products_fetch_function: String,
    pub products_admin_function: String,
    pub orders_function: String,
    pub order_events_fetch_function: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            products_fetch_function: "ProductsFetchFunction".to_string(),
            products_admin_function: "ProductsAdminFunction".to_string(),
            orders_function: "OrdersFunction".to_string(),
            order_events_fetch_function: "OrderEventsFetchFunction".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "pretty" or "json"
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
        }
    }
}

fn required(name: &str) -> Result<String> {
    let value = env::var(name).with_context(|| format!("{} is required", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} is required", name);
    }
    Ok(value)
}

fn pem(name: &str) -> Option<String> {
    env::var(name).ok().map(|value| value.replace("\\n", "\n"))
}

fn token_signing(prefix: &str) -> TokenSigningConfig {
    TokenSigningConfig {
        secret: env::var(format!("{}_TOKEN_SECRET", prefix))
            .ok()
            .filter(|s| !s.is_empty()),
        private_key_pem: pem(&format!("{}_TOKEN_PRIVATE_KEY", prefix)),
        public_key_pem: pem(&format!("{}_TOKEN_PUBLIC_KEY", prefix)),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let account_id = required("AWS_ACCOUNT_ID")?;
        if !ACCOUNT_ID_REGEX.is_match(&account_id) {
            anyhow::bail!("AWS_ACCOUNT_ID must be a 12-digit account number");
        }

        let tags: BTreeMap<String, String> = match env::var("STACK_TAGS") {
            Ok(raw) => serde_json::from_str(&raw).context("Invalid STACK_TAGS")?,
            Err(_) => BTreeMap::new(),
        };

        let defaults = HandlerConfig::default();

        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            deployment: DeploymentConfig {
                account_id,
                region: required("AWS_REGION")?,
                tags,
            },
            api: ApiConfig {
                rest_api_name: env::var("REST_API_NAME")
                    .unwrap_or_else(|_| "ECommerceApi".to_string()),
            },
            customer_realm: RealmConfig {
                pool_name: env::var("CUSTOMER_POOL_NAME")
                    .unwrap_or_else(|_| "CustomerPool".to_string()),
                domain_prefix: required("CUSTOMER_DOMAIN_PREFIX")?,
                token: token_signing("CUSTOMER"),
            },
            admin_realm: RealmConfig {
                pool_name: env::var("ADMIN_POOL_NAME").unwrap_or_else(|_| "AdminPool".to_string()),
                domain_prefix: required("ADMIN_DOMAIN_PREFIX")?,
                token: token_signing("ADMIN"),
            },
            hooks: HookConfig {
                blocked_emails: env::var("BLOCKED_EMAILS")
                    .map(|s| {
                        s.split(',')
                            .map(|e| e.trim().to_string())
                            .filter(|e| !e.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                block_reason: env::var("BLOCK_REASON").unwrap_or_else(|_| "TEST".to_string()),
            },
            handlers: HandlerConfig {
                products_fetch_function: env::var("PRODUCTS_FETCH_FUNCTION")
                    .unwrap_or(defaults.products_fetch_function),
                products_admin_function: env::var("PRODUCTS_ADMIN_FUNCTION")
                    .unwrap_or(defaults.products_admin_function),
                orders_function: env::var("ORDERS_FUNCTION").unwrap_or(defaults.orders_function),
                order_events_fetch_function: env::var("ORDER_EVENTS_FETCH_FUNCTION")
                    .unwrap_or(defaults.order_events_fetch_function),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(false),
            },
        })
    }

    /// Get local edge address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        http_host: "127.0.0.1".to_string(),
        http_port: 8080,
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
                secret: Some("customer-secret-for-tests-must-be-long".to_string()),
                ..Default::default()
            },
        },
        admin_realm: RealmConfig {
            pool_name: "AdminPool".to_string(),
            domain_prefix: "shop-admin".to_string(),
            token: TokenSigningConfig {
                secret: Some("admin-secret-for-tests-must-be-long".to_string()),
                ..Default::default()
            },
        },
        hooks: HookConfig {
            blocked_emails: vec!["blocked@example.com".to_string()],
            block_reason: "TEST".to_string(),
        },
        handlers: HandlerConfig::default(),
        telemetry: TelemetryConfig::default(),
    }
}
