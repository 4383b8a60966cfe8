//! Local edge server

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::domain::{HandlerTargets, RealmKind};
use crate::gateway::{EchoHandler, Gateway, HandlerRegistry};
use crate::identity::RealmSpecs;
use crate::jwt::{RealmKeys, RealmTokenVerifier};
use crate::middleware::edge_router;
use crate::surface::{handler_targets, ApiSettings, ApiSurface};

/// Registry where every configured handler echoes the event it receives.
pub fn echo_registry(targets: &HandlerTargets) -> HandlerRegistry {
    targets
        .all()
        .into_iter()
        .fold(HandlerRegistry::new(), |registry, target| {
            registry.register(&target.name, Arc::new(EchoHandler::new(&target.name)))
        })
}

/// Build the surface and wrap it in a gateway that verifies tokens from
/// both realms.
pub fn build_gateway(config: &Config, registry: HandlerRegistry) -> Result<Gateway> {
    let surface = ApiSurface::build(
        &ApiSettings::from_config(&config.api),
        &handler_targets(config),
        RealmSpecs::from_config(config),
        &config.deployment,
    )?;

    let mut verifier = RealmTokenVerifier::new();
    for (kind, realm_config) in [
        (RealmKind::Customer, &config.customer_realm),
        (RealmKind::Admin, &config.admin_realm),
    ] {
        let realm = surface
            .realm(kind)
            .with_context(|| format!("{} realm missing from surface", kind))?;
        let keys = RealmKeys::from_config(&realm_config.token)
            .with_context(|| format!("Token keys for the {} realm", kind))?;
        verifier = verifier.with_realm(realm, keys);
    }

    Ok(Gateway::new(surface, Arc::new(verifier), registry)?)
}

/// Run the local edge
pub async fn run(config: Config, prometheus: Option<PrometheusHandle>) -> Result<()> {
    let registry = echo_registry(&handler_targets(&config));
    let gateway = Arc::new(build_gateway(&config, registry)?);

    info!(
        api = %gateway.surface().settings().rest_api_name,
        routes = gateway.surface().methods().len(),
        "Edge ready"
    );

    let app = edge_router(gateway, prometheus);

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
