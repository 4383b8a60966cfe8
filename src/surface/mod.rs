//! API surface assembly
//!
//! [`ApiSurface::build`] runs one straight-line pass: realms, scope lattice,
//! authorizers, resource tree, then method bindings. Any contract violation
//! aborts the pass and nothing is returned.

pub mod authorizers;
pub mod builder;
pub mod grants;
pub mod manifest;
pub mod orders;
pub mod products;

use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::config::{ApiConfig, Config, DeploymentConfig};
use crate::domain::{
    AuthorizerBinding, AuthorizerId, HandlerTarget, HandlerTargets, HttpVerb, IdentityRealm,
    MethodBinding, RealmKind, ResourceId, ResourceTree, ScopeLattice, ValidatorId,
    ValidatorSchema,
};
use crate::error::BuildError;
use crate::identity::{build_realm, RealmSpecs};

use authorizers::{build_authorizer, ORDERS_AUTHORIZER, PRODUCTS_ADMIN_AUTHORIZER, PRODUCTS_AUTHORIZER};
use builder::SurfaceBuilder;

/// Standard access-log fields recorded for every request
pub const ACCESS_LOG_FIELDS: &[&str] = &[
    "httpMethod",
    "ip",
    "protocol",
    "requestTime",
    "resourcePath",
    "responseLength",
    "status",
    "caller",
    "user",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettings {
    pub rest_api_name: String,
    pub cloud_watch_role: bool,
    pub access_log_fields: Vec<String>,
}

impl ApiSettings {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            rest_api_name: config.rest_api_name.clone(),
            cloud_watch_role: true,
            access_log_fields: ACCESS_LOG_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Resolve the handler functions named in configuration.
pub fn handler_targets(config: &Config) -> HandlerTargets {
    let region = &config.deployment.region;
    let account = &config.deployment.account_id;
    let names = &config.handlers;
    HandlerTargets {
        products_fetch: HandlerTarget::lambda(
            "productsFetchHandler",
            &names.products_fetch_function,
            region,
            account,
        ),
        products_admin: HandlerTarget::lambda(
            "productsAdminHandler",
            &names.products_admin_function,
            region,
            account,
        ),
        orders: HandlerTarget::lambda("ordersHandler", &names.orders_function, region, account),
        order_events_fetch: HandlerTarget::lambda(
            "orderEventsFetchHandler",
            &names.order_events_fetch_function,
            region,
            account,
        ),
    }
}

/// Handles of the authorizers the route bindings refer to
#[derive(Debug, Clone, Copy)]
pub struct Authorizers {
    pub products: AuthorizerId,
    pub products_admin: AuthorizerId,
    pub orders: AuthorizerId,
}

/// The finished surface. Immutable once built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSurface {
    settings: ApiSettings,
    realms: Vec<IdentityRealm>,
    scope_lattice: ScopeLattice,
    authorizers: Vec<AuthorizerBinding>,
    resources: ResourceTree,
    validators: Vec<ValidatorSchema>,
    methods: Vec<MethodBinding>,
}

impl ApiSurface {
    pub fn build(
        settings: &ApiSettings,
        handlers: &HandlerTargets,
        specs: RealmSpecs,
        deployment: &DeploymentConfig,
    ) -> Result<Self, BuildError> {
        for target in handlers.all() {
            if !target.is_resolved() {
                return Err(BuildError::UnresolvedHandler(target.name.clone()));
            }
        }

        let realms = vec![
            build_realm(RealmKind::Customer, specs.customer, deployment)?,
            build_realm(RealmKind::Admin, specs.admin, deployment)?,
        ];
        let lattice = ScopeLattice::from_realms(&realms)?;

        let mut builder = SurfaceBuilder::new(lattice);
        let authorizers = Authorizers {
            products: builder.add_authorizer(build_authorizer(
                PRODUCTS_AUTHORIZER,
                &[RealmKind::Customer, RealmKind::Admin],
            )?)?,
            products_admin: builder
                .add_authorizer(build_authorizer(PRODUCTS_ADMIN_AUTHORIZER, &[RealmKind::Admin])?)?,
            orders: builder.add_authorizer(build_authorizer(
                ORDERS_AUTHORIZER,
                &[RealmKind::Admin, RealmKind::Customer],
            )?)?,
        };

        orders::bind(&mut builder, handlers, &authorizers)?;
        products::bind(&mut builder, handlers, &authorizers)?;

        let surface = Self {
            settings: settings.clone(),
            realms,
            scope_lattice: builder.lattice,
            authorizers: builder.authorizers,
            resources: builder.tree,
            validators: builder.validators,
            methods: builder.methods,
        };

        info!(
            api = %surface.settings.rest_api_name,
            resources = surface.resources.len(),
            methods = surface.methods.len(),
            "Built API surface"
        );
        Ok(surface)
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    pub fn realm(&self, kind: RealmKind) -> Option<&IdentityRealm> {
        self.realms.iter().find(|r| r.kind == kind)
    }

    pub fn realms(&self) -> &[IdentityRealm] {
        &self.realms
    }

    pub fn lattice(&self) -> &ScopeLattice {
        &self.scope_lattice
    }

    pub fn authorizer(&self, id: AuthorizerId) -> Option<&AuthorizerBinding> {
        self.authorizers.get(id.0)
    }

    pub fn authorizer_by_name(&self, name: &str) -> Option<(AuthorizerId, &AuthorizerBinding)> {
        self.authorizers
            .iter()
            .enumerate()
            .find(|(_, a)| a.name == name)
            .map(|(i, a)| (AuthorizerId(i), a))
    }

    pub fn authorizers(&self) -> &[AuthorizerBinding] {
        &self.authorizers
    }

    pub fn tree(&self) -> &ResourceTree {
        &self.resources
    }

    pub fn root(&self) -> ResourceId {
        self.resources.root()
    }

    pub fn resource_by_path(&self, path: &str) -> Option<ResourceId> {
        self.resources.find_by_path(path)
    }

    pub fn validator(&self, id: ValidatorId) -> Option<&ValidatorSchema> {
        self.validators.get(id.0)
    }

    pub fn validators(&self) -> &[ValidatorSchema] {
        &self.validators
    }

    pub fn method(&self, verb: HttpVerb, path: &str) -> Option<&MethodBinding> {
        self.methods
            .iter()
            .find(|m| m.verb == verb && m.path == path)
    }

    pub fn methods(&self) -> &[MethodBinding] {
        &self.methods
    }

    pub fn methods_on(&self, resource: ResourceId) -> impl Iterator<Item = &MethodBinding> {
        self.methods.iter().filter(move |m| m.resource == resource)
    }

    /// Routing table ordered by path then verb.
    pub fn routes(&self) -> Vec<RouteSummary> {
        let mut routes: Vec<RouteSummary> = self
            .methods
            .iter()
            .map(|m| RouteSummary {
                verb: m.verb,
                path: m.path.clone(),
                handler: m.handler.name.clone(),
                authorizer: m
                    .authorization
                    .as_ref()
                    .and_then(|a| self.authorizer(a.authorizer))
                    .map(|a| a.name.clone()),
                scopes: m.allowed_scopes().iter().map(ToString::to_string).collect(),
                validator: m
                    .validator
                    .and_then(|v| self.validator(v))
                    .map(|v| v.name.clone()),
            })
            .collect();
        routes.sort_by(|a, b| a.path.cmp(&b.path).then(a.verb.cmp(&b.verb)));
        routes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub verb: HttpVerb,
    pub path: String,
    pub handler: String,
    pub authorizer: Option<String>,
    pub scopes: Vec<String>,
    pub validator: Option<String>,
}

impl fmt::Display for RouteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<7} {:<16} {:<22} [{}] {}",
            self.verb.as_str(),
            self.path,
            self.handler,
            self.scopes.join(", "),
            self.validator.as_deref().unwrap_or("-")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::domain::ScopeRef;

    fn surface() -> ApiSurface {
        let config = test_config();
        ApiSurface::build(
            &ApiSettings::from_config(&config.api),
            &handler_targets(&config),
            RealmSpecs::from_config(&config),
            &config.deployment,
        )
        .unwrap()
    }

    #[test]
    fn test_resource_tree_shape() {
        let surface = surface();
        let tree = surface.tree();

        let products = surface.resource_by_path("/products").unwrap();
        let product = surface.resource_by_path("/products/{id}").unwrap();
        let orders = surface.resource_by_path("/orders").unwrap();
        let events = surface.resource_by_path("/orders/events").unwrap();

        assert_eq!(tree.get(product).unwrap().parent, Some(products));
        assert_eq!(tree.get(events).unwrap().parent, Some(orders));
        assert_eq!(tree.get(products).unwrap().parent, Some(surface.root()));
        assert_eq!(tree.len(), 5);
        assert_eq!(
            tree.iter().filter(|n| n.path == "/orders/events").count(),
            1
        );
    }

    #[test]
    fn test_nine_methods_bound() {
        assert_eq!(surface().methods().len(), 9);
    }

    #[test]
    fn test_products_write_is_admin_only() {
        let surface = surface();
        for (verb, path) in [
            (HttpVerb::Post, "/products"),
            (HttpVerb::Put, "/products/{id}"),
            (HttpVerb::Delete, "/products/{id}"),
        ] {
            let method = surface.method(verb, path).unwrap();
            assert_eq!(method.allowed_scopes(), &[ScopeRef::new("admin", "web")]);
            let authorizer = surface
                .authorizer(method.authorization.as_ref().unwrap().authorizer)
                .unwrap();
            assert_eq!(authorizer.realms, vec![RealmKind::Admin]);
        }
    }

    #[test]
    fn test_product_validator_shared_by_post_and_put() {
        let surface = surface();
        let post = surface.method(HttpVerb::Post, "/products").unwrap();
        let put = surface.method(HttpVerb::Put, "/products/{id}").unwrap();
        assert!(post.validator.is_some());
        assert_eq!(post.validator, put.validator);
    }

    #[test]
    fn test_realm_handles_exposed() {
        let surface = surface();
        assert!(surface.realm(RealmKind::Customer).unwrap().allows_self_sign_up());
        assert!(!surface.realm(RealmKind::Admin).unwrap().allows_self_sign_up());
        assert_eq!(surface.lattice().len(), 3);
    }

    #[test]
    fn test_unresolved_handler_aborts_build() {
        let config = test_config();
        let mut handlers = handler_targets(&config);
        handlers.order_events_fetch.function_arn.clear();

        let err = ApiSurface::build(
            &ApiSettings::from_config(&config.api),
            &handlers,
            RealmSpecs::from_config(&config),
            &config.deployment,
        )
        .unwrap_err();
        assert_eq!(err, BuildError::UnresolvedHandler("orderEventsFetchHandler".to_string()));
    }

    #[test]
    fn test_misconfigured_realm_aborts_build() {
        let config = test_config();
        let mut specs = RealmSpecs::from_config(&config);
        specs.admin.resource_server.identifier = "customer".to_string();
        specs.admin.clients[0].scope = ScopeRef::new("customer", "web");

        let err = ApiSurface::build(
            &ApiSettings::from_config(&config.api),
            &handler_targets(&config),
            specs,
            &config.deployment,
        )
        .unwrap_err();
        assert_eq!(err, BuildError::DuplicateResourceServer("customer".to_string()));
    }

    #[test]
    fn test_handler_targets_from_config() {
        let targets = handler_targets(&test_config());
        assert_eq!(
            targets.orders.function_arn,
            "arn:aws:lambda:us-east-1:123456789012:function:OrdersFunction"
        );
        assert_eq!(targets.order_events_fetch.name, "orderEventsFetchHandler");
    }

    #[test]
    fn test_access_log_fields() {
        let settings = ApiSettings::from_config(&test_config().api);
        assert!(settings.cloud_watch_role);
        assert_eq!(settings.access_log_fields.len(), 9);
    }
}
