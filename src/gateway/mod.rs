//! Edge enforcement
//!
//! A request is matched against the resource tree, authorized, validated and
//! only then handed to its handler. Every rejection happens before the
//! handler is reached.

pub mod handler;
pub mod validation;

use metrics::counter;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{HttpVerb, MethodBinding, MethodAuthorization};
use crate::error::{AppError, BuildError, Result};
use crate::jwt::TokenVerifier;
use crate::policy;
use crate::surface::ApiSurface;

pub use handler::{
    CallerIdentity, EchoHandler, HandlerEvent, HandlerRegistry, HandlerResponse, RequestContext,
    RequestHandler,
};
use validation::{passthrough_body, CompiledValidator};

/// A request as it arrives at the edge, before any matching
#[derive(Debug, Clone, Default)]
pub struct EdgeRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Raw `Authorization` header value
    pub authorization: Option<String>,
    pub body: Option<Vec<u8>>,
    pub request_id: Option<String>,
}

impl EdgeRequest {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.authorization = Some(format!("Bearer {}", token));
        self
    }

    pub fn query_param(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }

    pub fn json_body(mut self, body: &Value) -> Self {
        self.body = Some(body.to_string().into_bytes());
        self
    }
}

pub struct Gateway {
    surface: Arc<ApiSurface>,
    verifier: Arc<dyn TokenVerifier>,
    registry: HandlerRegistry,
    validators: Vec<CompiledValidator>,
}

impl Gateway {
    /// Compile every validator and check each bound handler is registered.
    pub fn new(
        surface: ApiSurface,
        verifier: Arc<dyn TokenVerifier>,
        registry: HandlerRegistry,
    ) -> std::result::Result<Self, BuildError> {
        let validators = surface
            .validators()
            .iter()
            .map(CompiledValidator::compile)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for method in surface.methods() {
            if !registry.contains(&method.handler.name) {
                return Err(BuildError::UnresolvedHandler(method.handler.name.clone()));
            }
        }

        Ok(Self {
            surface: Arc::new(surface),
            verifier,
            registry,
            validators,
        })
    }

    pub fn surface(&self) -> &ApiSurface {
        &self.surface
    }

    pub fn surface_handle(&self) -> Arc<ApiSurface> {
        self.surface.clone()
    }

    /// Run a request through the edge and its handler.
    pub async fn dispatch(&self, request: EdgeRequest) -> Result<HandlerResponse> {
        let outcome = self.process(request).await;

        let label = match &outcome {
            Ok(_) => "invoked",
            Err(AppError::NotFound(_)) => "not_found",
            Err(AppError::MethodNotAllowed(_)) => "method_not_allowed",
            Err(AppError::Unauthorized(_)) | Err(AppError::Jwt(_)) => "unauthorized",
            Err(AppError::Forbidden(_)) => "forbidden",
            Err(AppError::BadRequest(_)) => "invalid",
            Err(_) => "error",
        };
        counter!("ecommerce_edge_requests_total", "outcome" => label).increment(1);

        outcome
    }

    async fn process(&self, request: EdgeRequest) -> Result<HandlerResponse> {
        let (binding, path_parameters) = self.route(&request)?;

        let caller = match &binding.authorization {
            Some(authorization) => Some(self.authorize(authorization, &request)?),
            None => None,
        };

        let body = match binding.validator {
            Some(id) => {
                let validator = self.validators.get(id.0).ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!("Validator {} was not compiled", id))
                })?;
                validator
                    .validate(&request.query, request.body.as_deref())
                    .inspect_err(|e| {
                        info!(validator = validator.name(), path = %request.path, "Request rejected: {}", e)
                    })?
            }
            None => passthrough_body(request.body.as_deref()),
        };

        let handler = self.registry.get(&binding.handler.name).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Handler '{}' is not registered",
                binding.handler.name
            ))
        })?;

        let event = HandlerEvent {
            http_method: binding.verb,
            resource: binding.path.clone(),
            path: request.path.clone(),
            path_parameters,
            query_string_parameters: request.query,
            body,
            request_context: RequestContext {
                request_id: request
                    .request_id
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                caller,
            },
        };

        debug!(handler = %binding.handler.name, resource = %binding.path, "Invoking handler");
        handler.handle(event).await
    }

    fn route(&self, request: &EdgeRequest) -> Result<(&MethodBinding, HashMap<String, String>)> {
        let matched = self
            .surface
            .tree()
            .match_path(&request.path)
            .ok_or_else(|| AppError::NotFound(format!("No resource at {}", request.path)))?;

        let mut methods = self.surface.methods_on(matched.resource).peekable();
        if methods.peek().is_none() {
            return Err(AppError::NotFound(format!(
                "No methods bound at {}",
                request.path
            )));
        }

        let verb = HttpVerb::parse(&request.method);
        let binding = methods
            .find(|m| Some(m.verb) == verb)
            .ok_or_else(|| {
                AppError::MethodNotAllowed(format!("{} {}", request.method, request.path))
            })?;

        Ok((binding, matched.path_parameters))
    }

    fn authorize(
        &self,
        authorization: &MethodAuthorization,
        request: &EdgeRequest,
    ) -> Result<CallerIdentity> {
        let token = bearer_token(request.authorization.as_deref())?;
        let verified = self.verifier.verify(token).inspect_err(|e| {
            info!(path = %request.path, "Token rejected: {}", e);
        })?;

        let binding = self
            .surface
            .authorizer(authorization.authorizer)
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "Unknown authorizer {}",
                    authorization.authorizer.0
                ))
            })?;

        let granted = policy::authorize(
            binding,
            &authorization.allowed_scopes,
            &verified,
            self.surface.lattice(),
        )
        .inspect_err(|e| {
            info!(
                realm = %verified.realm,
                subject = %verified.subject,
                authorizer = %binding.name,
                "Authorization rejected: {}", e
            );
        })?;

        Ok(CallerIdentity {
            realm: verified.realm,
            granted_scope: granted.to_string(),
            claims: verified.claims,
        })
    }
}

fn bearer_token(header: Option<&str>) -> Result<&str> {
    let header =
        header.ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;
    header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Authorization header must use Bearer scheme".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(matches!(bearer_token(None), Err(AppError::Unauthorized(_))));
        assert!(matches!(
            bearer_token(Some("Basic dXNlcjpwYXNz")),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_edge_request_builder() {
        let request = EdgeRequest::new("DELETE", "/orders")
            .bearer("t")
            .query_param("email", "a@example.com");
        assert_eq!(request.authorization.as_deref(), Some("Bearer t"));
        assert_eq!(request.query.get("email").map(String::as_str), Some("a@example.com"));
    }
}
