//! Synthesized description of the whole deployment.

use serde::Serialize;

use super::grants::{user_lookup_grants, PermissionGrant};
use super::{handler_targets, ApiSettings, ApiSurface, RouteSummary};
use crate::config::Config;
use crate::error::BuildError;
use crate::identity::RealmSpecs;
use crate::stack::layers::{invoice_layers, LayerVersion};
use crate::stack::StackGraph;

/// Stack revision this build implements. Earlier revisions are in CHANGELOG.md.
pub const REVISION: &str = "r3";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub revision: String,
    pub deployment_order: Vec<String>,
    pub stacks: StackGraph,
    pub layers: Vec<LayerVersion>,
    pub api: ApiSurface,
    pub routes: Vec<RouteSummary>,
    pub grants: Vec<PermissionGrant>,
}

impl Manifest {
    pub fn synthesize(config: &Config) -> Result<Self, BuildError> {
        let stacks = StackGraph::ecommerce(&config.deployment)?;
        let deployment_order = stacks
            .deployment_order()?
            .into_iter()
            .map(str::to_string)
            .collect();

        let handlers = handler_targets(config);
        let api = ApiSurface::build(
            &ApiSettings::from_config(&config.api),
            &handlers,
            RealmSpecs::from_config(config),
            &config.deployment,
        )?;
        let grants = user_lookup_grants(&api, &handlers);

        Ok(Self {
            revision: REVISION.to_string(),
            deployment_order,
            stacks,
            layers: invoice_layers(&config.deployment),
            routes: api.routes(),
            api,
            grants,
        })
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_synthesize() {
        let manifest = Manifest::synthesize(&test_config()).unwrap();

        assert_eq!(manifest.revision, "r3");
        assert_eq!(manifest.deployment_order.last().map(String::as_str), Some("ECommerceApi"));
        assert_eq!(manifest.layers.len(), 3);
        assert_eq!(manifest.routes.len(), 9);
        assert_eq!(manifest.grants.len(), 2);
    }

    #[test]
    fn test_manifest_json_omits_credentials() {
        let json = Manifest::synthesize(&test_config())
            .unwrap()
            .to_json(false)
            .unwrap();

        assert!(json.contains("\"restApiName\":\"ECommerceApi\""));
        assert!(!json.contains("customer-secret"));
    }
}
