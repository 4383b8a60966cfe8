//! Shared code layers published for the invoice functions

use serde::Serialize;

use crate::config::DeploymentConfig;

pub const LAYER_RUNTIME: &str = "nodejs14.x";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemovalPolicy {
    Retain,
    Destroy,
}

/// Lookup parameter under which a layer version is published
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringParameter {
    pub parameter_name: String,
    pub string_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerVersion {
    pub name: String,
    pub asset_path: String,
    pub compatible_runtimes: Vec<String>,
    pub removal_policy: RemovalPolicy,
    pub version_arn: String,
    pub parameter: StringParameter,
}

impl LayerVersion {
    fn retained(name: &str, asset_dir: &str, deployment: &DeploymentConfig) -> Self {
        let version_arn = format!(
            "arn:aws:lambda:{}:{}:layer:{}:1",
            deployment.region, deployment.account_id, name
        );
        Self {
            name: name.to_string(),
            asset_path: format!("lambda/invoices/layers/{}", asset_dir),
            compatible_runtimes: vec![LAYER_RUNTIME.to_string()],
            removal_policy: RemovalPolicy::Retain,
            parameter: StringParameter {
                parameter_name: format!("{}VersionArn", name),
                string_value: version_arn.clone(),
            },
            version_arn,
        }
    }
}

pub fn invoice_layers(deployment: &DeploymentConfig) -> Vec<LayerVersion> {
    [
        ("InvoiceTransactionLayer", "invoiceTransactionLayer"),
        ("InvoiceRepositoryLayer", "invoiceRepositoryLayer"),
        ("InvoiceWSConnectionLayer", "invoiceWSConnectionLayer"),
    ]
    .into_iter()
    .map(|(name, dir)| LayerVersion::retained(name, dir, deployment))
    .collect()
}
