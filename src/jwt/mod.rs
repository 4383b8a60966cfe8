//! Realm access tokens
//!
//! Tokens follow the shape realms issue for OAuth clients: a space-delimited
//! `scope` claim, `token_use` discriminator and the issuing pool as `iss`.

use crate::config::TokenSigningConfig;
use crate::domain::{IdentityRealm, RealmKind};
use crate::error::{AppError, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOKEN_USE_ACCESS: &str = "access";
pub const TOKEN_USE_REFRESH: &str = "refresh";

/// Access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (principal ID)
    pub sub: String,
    /// Issuer (realm issuer URL)
    pub iss: String,
    /// Client the token was issued to
    pub client_id: String,
    /// Token type discriminator
    pub token_use: String,
    /// Space-delimited `<resource-server>/<scope>` values
    #[serde(default)]
    pub scope: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Unique token ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl AccessTokenClaims {
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iss: String,
    pub client_id: String,
    pub token_use: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys of one realm
#[derive(Clone)]
pub struct RealmKeys {
    algorithm: Algorithm,
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
}

impl RealmKeys {
    /// HS256 when only a secret is configured, RS256 when PEMs are configured.
    pub fn from_config(config: &TokenSigningConfig) -> Result<Self> {
        if let Some(public_key) = config.public_key_pem.as_ref() {
            let decoding_key = DecodingKey::from_rsa_pem(public_key.as_bytes())?;
            let encoding_key = match config.private_key_pem.as_ref() {
                Some(private_key) => Some(EncodingKey::from_rsa_pem(private_key.as_bytes())?),
                None => None,
            };
            return Ok(Self {
                algorithm: Algorithm::RS256,
                encoding_key,
                decoding_key,
            });
        }

        if config.private_key_pem.is_some() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "An RSA private key requires the matching public key"
            )));
        }

        match config.secret.as_ref() {
            Some(secret) => Ok(Self::from_secret(secret)),
            None => Err(AppError::Internal(anyhow::anyhow!(
                "No token key material configured"
            ))),
        }
    }

    pub fn from_secret(secret: &str) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding_key: Some(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sign arbitrary claims with this realm's key.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String> {
        let key = self.encoding_key.as_ref().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Realm keys are verification-only"))
        })?;
        Ok(encode(&Header::new(self.algorithm), claims, key)?)
    }

    /// Create a Validation with a strict leeway (5 seconds) pinned to `issuer`.
    fn validation(&self, issuer: &str) -> Validation {
        let mut v = Validation::new(self.algorithm);
        v.leeway = 5;
        v.validate_aud = false;
        v.set_issuer(&[issuer]);
        v.set_required_spec_claims(&["exp", "iss", "sub"]);
        v
    }
}

/// Issues tokens for the clients of one realm
#[derive(Clone)]
pub struct RealmTokenIssuer {
    realm: IdentityRealm,
    keys: RealmKeys,
}

impl RealmTokenIssuer {
    pub fn new(realm: &IdentityRealm, keys: RealmKeys) -> Self {
        Self {
            realm: realm.clone(),
            keys,
        }
    }

    pub fn keys(&self) -> &RealmKeys {
        &self.keys
    }

    /// Issue an access token carrying the client's declared scope.
    pub fn issue_access_token(
        &self,
        client_name: &str,
        subject: &str,
        username: &str,
        email: Option<&str>,
    ) -> Result<String> {
        let client = self.realm.client(client_name).ok_or_else(|| {
            AppError::NotFound(format!(
                "Client '{}' is not registered on realm '{}'",
                client_name,
                self.realm.name()
            ))
        })?;

        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: subject.to_string(),
            iss: self.realm.issuer.clone(),
            client_id: client.name.clone(),
            token_use: TOKEN_USE_ACCESS.to_string(),
            scope: client.scope.to_string(),
            username: username.to_string(),
            email: email.map(str::to_string),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + client.token_validity.access()).timestamp(),
        };

        self.keys.sign(&claims)
    }

    pub fn issue_refresh_token(&self, client_name: &str, subject: &str) -> Result<String> {
        let client = self.realm.client(client_name).ok_or_else(|| {
            AppError::NotFound(format!("Client '{}' is not registered", client_name))
        })?;

        let now = Utc::now();
        let claims = RefreshClaims {
            sub: subject.to_string(),
            iss: self.realm.issuer.clone(),
            client_id: client.name.clone(),
            token_use: TOKEN_USE_REFRESH.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + client.token_validity.refresh()).timestamp(),
        };

        self.keys.sign(&claims)
    }
}

/// A token whose signature, issuer and lifetime have been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub realm: RealmKind,
    pub subject: String,
    pub username: String,
    pub scopes: Vec<String>,
    pub claims: AccessTokenClaims,
}

impl VerifiedToken {
    pub fn new(realm: RealmKind, claims: AccessTokenClaims) -> Self {
        Self {
            realm,
            subject: claims.sub.clone(),
            username: claims.username.clone(),
            scopes: claims.scopes().map(str::to_string).collect(),
            claims,
        }
    }
}

/// Verifies bearer tokens presented at the edge
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<VerifiedToken>;
}

struct RealmVerificationKey {
    realm: RealmKind,
    issuer: String,
    keys: RealmKeys,
}

/// Verifies tokens against every registered realm's issuer and key
#[derive(Default)]
pub struct RealmTokenVerifier {
    realms: Vec<RealmVerificationKey>,
}

impl RealmTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_realm(mut self, realm: &IdentityRealm, keys: RealmKeys) -> Self {
        self.realms.push(RealmVerificationKey {
            realm: realm.kind,
            issuer: realm.issuer.clone(),
            keys,
        });
        self
    }
}

impl TokenVerifier for RealmTokenVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let mut expired = false;

        for entry in &self.realms {
            let validation = entry.keys.validation(&entry.issuer);
            match decode::<AccessTokenClaims>(token, &entry.keys.decoding_key, &validation) {
                Ok(data) => {
                    if data.claims.token_use != TOKEN_USE_ACCESS {
                        return Err(AppError::Unauthorized(
                            "Token is not an access token".to_string(),
                        ));
                    }
                    return Ok(VerifiedToken::new(entry.realm, data.claims));
                }
                Err(e) => {
                    if matches!(
                        e.kind(),
                        jsonwebtoken::errors::ErrorKind::ExpiredSignature
                    ) {
                        expired = true;
                    }
                }
            }
        }

        if expired {
            Err(AppError::Unauthorized("Token expired".to_string()))
        } else {
            Err(AppError::Unauthorized("Invalid or expired token".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::domain::RealmKind;
    use crate::identity::{admin_realm_spec, build_realm, customer_realm_spec};

    fn realms() -> (IdentityRealm, IdentityRealm) {
        let config = test_config();
        let customer = build_realm(
            RealmKind::Customer,
            customer_realm_spec(&config.customer_realm, &config.deployment),
            &config.deployment,
        )
        .unwrap();
        let admin = build_realm(
            RealmKind::Admin,
            admin_realm_spec(&config.admin_realm),
            &config.deployment,
        )
        .unwrap();
        (customer, admin)
    }

    fn verifier(customer: &IdentityRealm, admin: &IdentityRealm) -> RealmTokenVerifier {
        RealmTokenVerifier::new()
            .with_realm(customer, RealmKeys::from_secret("customer-secret"))
            .with_realm(admin, RealmKeys::from_secret("admin-secret"))
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let (customer, admin) = realms();
        let issuer = RealmTokenIssuer::new(&customer, RealmKeys::from_secret("customer-secret"));

        let token = issuer
            .issue_access_token("customerMobileClient", "u-1", "shopper", Some("s@example.com"))
            .unwrap();
        let verified = verifier(&customer, &admin).verify(&token).unwrap();

        assert_eq!(verified.realm, RealmKind::Customer);
        assert_eq!(verified.subject, "u-1");
        assert_eq!(verified.username, "shopper");
        assert_eq!(verified.scopes, vec!["customer/mobile"]);
        assert_eq!(verified.claims.exp - verified.claims.iat, 60 * 60);
    }

    #[test]
    fn test_unknown_client_rejected() {
        let (customer, _) = realms();
        let issuer = RealmTokenIssuer::new(&customer, RealmKeys::from_secret("customer-secret"));

        let err = issuer
            .issue_access_token("adminWebClient", "u-1", "shopper", None)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_token_signed_with_wrong_key_rejected() {
        let (customer, admin) = realms();
        let issuer = RealmTokenIssuer::new(&customer, RealmKeys::from_secret("not-the-secret"));
        let token = issuer
            .issue_access_token("customerWebClient", "u-1", "shopper", None)
            .unwrap();

        assert!(matches!(
            verifier(&customer, &admin).verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_issuer_must_match_signing_realm() {
        let (customer, admin) = realms();
        // Customer-issued claims signed with the admin key
        let issuer = RealmTokenIssuer::new(&customer, RealmKeys::from_secret("admin-secret"));
        let token = issuer
            .issue_access_token("customerWebClient", "u-1", "shopper", None)
            .unwrap();

        assert!(verifier(&customer, &admin).verify(&token).is_err());
    }

    #[test]
    fn test_refresh_token_not_accepted_as_access_token() {
        let (customer, admin) = realms();
        let issuer = RealmTokenIssuer::new(&customer, RealmKeys::from_secret("customer-secret"));
        let token = issuer.issue_refresh_token("customerWebClient", "u-1").unwrap();

        assert!(verifier(&customer, &admin).verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let (customer, admin) = realms();
        let keys = RealmKeys::from_secret("customer-secret");
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: "u-1".to_string(),
            iss: customer.issuer.clone(),
            client_id: "customerWebClient".to_string(),
            token_use: TOKEN_USE_ACCESS.to_string(),
            scope: "customer/web".to_string(),
            username: "shopper".to_string(),
            email: None,
            jti: "j".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = keys.sign(&claims).unwrap();

        let err = verifier(&customer, &admin).verify(&token).unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized: Token expired");
    }

    #[test]
    fn test_keys_from_config_requires_material() {
        assert!(RealmKeys::from_config(&TokenSigningConfig::default()).is_err());

        let keys = RealmKeys::from_config(&TokenSigningConfig {
            secret: Some("s".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(keys.algorithm(), Algorithm::HS256);
    }
}
