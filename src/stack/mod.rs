//! Outer deployment graph
//!
//! Stacks are ordered with Kahn's algorithm; among stacks whose dependencies
//! are all satisfied, the one declared first deploys first.

pub mod layers;

use serde::{Serialize, Serializer};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::debug;

use crate::config::DeploymentConfig;
use crate::error::BuildError;

pub const PRODUCTS_APP_LAYERS: &str = "ProductsAppLayers";
pub const PRODUCTS_APP: &str = "ProductsApp";
pub const ORDERS_APP: &str = "OrdersApp";
pub const INVOICES_APP_LAYERS: &str = "InvoicesAppLayers";
pub const ECOMMERCE_API: &str = "ECommerceApi";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub account: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackNode {
    pub name: String,
    pub env: Environment,
    pub tags: BTreeMap<String, String>,
    /// Indices of the stacks this one depends on
    dependencies: Vec<usize>,
}

/// Serialized form of a stack, with dependencies named rather than indexed.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StackView<'a> {
    name: &'a str,
    env: &'a Environment,
    tags: &'a BTreeMap<String, String>,
    depends_on: Vec<&'a str>,
}

/// Serializes as the list of stacks in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StackGraph {
    stacks: Vec<StackNode>,
}

impl Serialize for StackGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.stacks.iter().map(|stack| StackView {
            name: &stack.name,
            env: &stack.env,
            tags: &stack.tags,
            depends_on: stack
                .dependencies
                .iter()
                .map(|&i| self.stacks[i].name.as_str())
                .collect(),
        }))
    }
}

impl StackGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stacks of the e-commerce application and their dependencies.
    pub fn ecommerce(deployment: &DeploymentConfig) -> Result<Self, BuildError> {
        let mut graph = Self::new();
        for name in [
            PRODUCTS_APP_LAYERS,
            PRODUCTS_APP,
            ORDERS_APP,
            INVOICES_APP_LAYERS,
            ECOMMERCE_API,
        ] {
            graph.add_stack(name, deployment);
        }

        graph.add_dependency(PRODUCTS_APP, PRODUCTS_APP_LAYERS)?;
        graph.add_dependency(ORDERS_APP, PRODUCTS_APP)?;
        graph.add_dependency(ECOMMERCE_API, PRODUCTS_APP)?;
        graph.add_dependency(ECOMMERCE_API, ORDERS_APP)?;
        Ok(graph)
    }

    /// Declare a stack. Declaring an existing name is a no-op.
    pub fn add_stack(&mut self, name: &str, deployment: &DeploymentConfig) {
        if self.index_of(name).is_some() {
            return;
        }
        self.stacks.push(StackNode {
            name: name.to_string(),
            env: Environment {
                account: deployment.account_id.clone(),
                region: deployment.region.clone(),
            },
            tags: deployment.tags.clone(),
            dependencies: vec![],
        });
    }

    /// `dependent` deploys only after `dependency`.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> Result<(), BuildError> {
        let from = self
            .index_of(dependent)
            .ok_or_else(|| BuildError::UnknownStack(dependent.to_string()))?;
        let to = self
            .index_of(dependency)
            .ok_or_else(|| BuildError::UnknownStack(dependency.to_string()))?;

        if from == to {
            return Err(BuildError::DependencyCycle(dependent.to_string()));
        }
        if !self.stacks[from].dependencies.contains(&to) {
            self.stacks[from].dependencies.push(to);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&StackNode> {
        self.index_of(name).map(|i| &self.stacks[i])
    }

    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .map(|s| {
                s.dependencies
                    .iter()
                    .map(|&i| self.stacks[i].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Stack names in an order that deploys every dependency first.
    pub fn deployment_order(&self) -> Result<Vec<&str>, BuildError> {
        let n = self.stacks.len();
        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![vec![]; n];

        for (idx, stack) in self.stacks.iter().enumerate() {
            for &dep in &stack.dependencies {
                in_degree[idx] += 1;
                dependents[dep].push(idx);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(self.stacks[idx].name.as_str());
            for &next in &dependents[idx] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() < n {
            let stuck = in_degree
                .iter()
                .position(|&d| d > 0)
                .map(|i| self.stacks[i].name.clone())
                .unwrap_or_default();
            return Err(BuildError::DependencyCycle(stuck));
        }

        debug!(order = ?order, "Resolved stack deployment order");
        Ok(order)
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.stacks.iter().position(|s| s.name == name)
    }
}
