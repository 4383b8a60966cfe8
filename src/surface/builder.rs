//! Incremental assembly of a surface.
//!
//! Only [`super::ApiSurface::build`] drives a `SurfaceBuilder`; callers only
//! ever see the finished, immutable surface.

use tracing::debug;

use crate::domain::{
    AuthorizationOptions, AuthorizerBinding, AuthorizerId, HandlerTarget, HttpVerb,
    MethodAuthorization, MethodBinding, QueryParameter, ResourceId, ResourceTree, ScopeLattice,
    ScopeRef, ValidatorId, ValidatorSchema,
};
use crate::error::BuildError;

/// Optional parts of a method binding
#[derive(Debug, Clone, Default)]
pub struct MethodOptions<'a> {
    pub authorization: Option<AuthorizationOptions<'a>>,
    pub validator: Option<ValidatorId>,
    pub query_parameters: Vec<QueryParameter>,
}

impl<'a> MethodOptions<'a> {
    pub fn authorized(authorizer: AuthorizerId, scopes: &'a [&'a str]) -> Self {
        Self {
            authorization: Some(AuthorizationOptions { authorizer, scopes }),
            ..Default::default()
        }
    }

    pub fn validated_by(mut self, validator: ValidatorId) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn query_parameters(mut self, parameters: Vec<QueryParameter>) -> Self {
        self.query_parameters = parameters;
        self
    }
}

pub struct SurfaceBuilder {
    pub(super) lattice: ScopeLattice,
    pub(super) tree: ResourceTree,
    pub(super) authorizers: Vec<AuthorizerBinding>,
    pub(super) validators: Vec<ValidatorSchema>,
    pub(super) methods: Vec<MethodBinding>,
}

impl SurfaceBuilder {
    pub fn new(lattice: ScopeLattice) -> Self {
        Self {
            lattice,
            tree: ResourceTree::new(),
            authorizers: vec![],
            validators: vec![],
            methods: vec![],
        }
    }

    pub fn root(&self) -> ResourceId {
        self.tree.root()
    }

    /// Idempotent per (parent, segment).
    pub fn add_resource(&mut self, parent: ResourceId, segment: &str) -> Result<ResourceId, BuildError> {
        self.tree.add_resource(parent, segment)
    }

    pub fn add_authorizer(&mut self, binding: AuthorizerBinding) -> Result<AuthorizerId, BuildError> {
        if self.authorizers.iter().any(|a| a.name == binding.name) {
            return Err(BuildError::DuplicateAuthorizer(binding.name));
        }
        let id = AuthorizerId(self.authorizers.len());
        debug!(authorizer = %binding.name, realms = ?binding.realms, "Registered authorizer");
        self.authorizers.push(binding);
        Ok(id)
    }

    pub fn add_validator(&mut self, validator: ValidatorSchema) -> Result<ValidatorId, BuildError> {
        validator.check()?;
        if self.validators.iter().any(|v| v.name == validator.name) {
            return Err(BuildError::InvalidSchema {
                name: validator.name,
                reason: "validator declared twice".to_string(),
            });
        }
        let id = ValidatorId(self.validators.len());
        debug!(validator = %validator.name, target = ?validator.target(), "Registered validator");
        self.validators.push(validator);
        Ok(id)
    }

    /// Bind `verb` on `resource` to `handler`.
    ///
    /// Every allowed scope must resolve in the lattice and belong to a realm
    /// the chosen authorizer accepts.
    pub fn add_method(
        &mut self,
        resource: ResourceId,
        verb: HttpVerb,
        handler: &HandlerTarget,
        options: MethodOptions<'_>,
    ) -> Result<&MethodBinding, BuildError> {
        let path = self.tree.node(resource)?.path.clone();

        if !handler.is_resolved() {
            return Err(BuildError::UnresolvedHandler(handler.name.clone()));
        }

        if self
            .methods
            .iter()
            .any(|m| m.resource == resource && m.verb == verb)
        {
            return Err(BuildError::DuplicateMethod {
                verb: verb.to_string(),
                path,
            });
        }

        let authorization = match options.authorization {
            Some(auth) => Some(self.resolve_authorization(&auth)?),
            None => None,
        };

        if let Some(validator) = options.validator {
            if validator.0 >= self.validators.len() {
                return Err(BuildError::UnknownValidator(validator.0));
            }
        }

        debug!(%verb, path = %path, handler = %handler.name, "Bound method");
        self.methods.push(MethodBinding {
            resource,
            path,
            verb,
            handler: handler.clone(),
            authorization,
            validator: options.validator,
            query_parameters: options.query_parameters,
        });

        let index = self.methods.len() - 1;
        Ok(&self.methods[index])
    }

    fn resolve_authorization(
        &self,
        options: &AuthorizationOptions<'_>,
    ) -> Result<MethodAuthorization, BuildError> {
        let binding = self
            .authorizers
            .get(options.authorizer.0)
            .ok_or(BuildError::UnknownAuthorizer(options.authorizer.0))?;

        if options.scopes.is_empty() {
            return Err(BuildError::MissingScopes(binding.name.clone()));
        }

        let mut allowed_scopes: Vec<ScopeRef> = Vec::with_capacity(options.scopes.len());
        for raw in options.scopes {
            let entry = self.lattice.resolve(raw)?;
            if !binding.accepts(entry.realm) {
                return Err(BuildError::ScopeOutsideAuthorizer {
                    scope: entry.scope.to_string(),
                    realm: entry.realm.to_string(),
                    authorizer: binding.name.clone(),
                });
            }
            if !allowed_scopes.contains(&entry.scope) {
                allowed_scopes.push(entry.scope);
            }
        }

        Ok(MethodAuthorization {
            authorizer: options.authorizer,
            allowed_scopes,
        })
    }
}
