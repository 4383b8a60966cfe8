//! Resource tree under the single API root
//!
//! Nodes live in an arena and refer to their parent by id, so the tree can be
//! navigated upward without any node owning its parent.

use crate::error::BuildError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

lazy_static! {
    static ref LITERAL_SEGMENT: Regex = Regex::new(r"^[A-Za-z0-9._~-]+$").unwrap();
    static ref PARAM_SEGMENT: Regex = Regex::new(r"^\{([A-Za-z_][A-Za-z0-9_]*)\}$").unwrap();
}

/// Handle to a node of a [`ResourceTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceId(pub usize);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Segment {
    Literal(String),
    /// `{name}` captures one path segment into the `name` path parameter
    Param(String),
}

impl Segment {
    pub fn parse(raw: &str) -> Result<Self, BuildError> {
        if let Some(captures) = PARAM_SEGMENT.captures(raw) {
            return Ok(Segment::Param(captures[1].to_string()));
        }
        if LITERAL_SEGMENT.is_match(raw) {
            return Ok(Segment::Literal(raw.to_string()));
        }
        Err(BuildError::InvalidSegment(raw.to_string()))
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Segment::Param(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(s) => write!(f, "{}", s),
            Segment::Param(name) => write!(f, "{{{}}}", name),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceNode {
    pub id: ResourceId,
    /// `None` only for the root
    pub segment: Option<Segment>,
    pub parent: Option<ResourceId>,
    pub children: Vec<ResourceId>,
    /// Full path from the root (`/products/{id}`)
    pub path: String,
}

/// Outcome of matching a concrete request path against the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    pub resource: ResourceId,
    pub path_parameters: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceTree {
    nodes: Vec<ResourceNode>,
}

impl Default for ResourceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![ResourceNode {
                id: ResourceId(0),
                segment: None,
                parent: None,
                children: vec![],
                path: "/".to_string(),
            }],
        }
    }

    pub fn root(&self) -> ResourceId {
        ResourceId(0)
    }

    pub fn get(&self, id: ResourceId) -> Option<&ResourceNode> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: ResourceId) -> Result<&ResourceNode, BuildError> {
        self.get(id).ok_or(BuildError::UnknownResource(id.0))
    }

    pub fn path(&self, id: ResourceId) -> Option<&str> {
        self.get(id).map(|n| n.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // the root always exists
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter()
    }

    /// Add `segment` under `parent`.
    ///
    /// Idempotent: adding a segment that already exists under the same parent
    /// returns the existing node, so each path stays reachable exactly once.
    pub fn add_resource(&mut self, parent: ResourceId, segment: &str) -> Result<ResourceId, BuildError> {
        let segment = Segment::parse(segment)?;
        let parent_node = self.node(parent)?;

        for child_id in &parent_node.children {
            let child = &self.nodes[child_id.0];
            match (&child.segment, &segment) {
                (Some(existing), new) if existing == new => {
                    tracing::debug!(path = %child.path, "Reusing existing resource");
                    return Ok(*child_id);
                }
                (Some(Segment::Param(existing)), Segment::Param(new)) => {
                    return Err(BuildError::ConflictingPathParameter {
                        parent: parent_node.path.clone(),
                        existing: existing.clone(),
                        new: new.clone(),
                    });
                }
                _ => {}
            }
        }

        let path = if parent_node.parent.is_none() {
            format!("/{}", segment)
        } else {
            format!("{}/{}", parent_node.path, segment)
        };

        let id = ResourceId(self.nodes.len());
        self.nodes.push(ResourceNode {
            id,
            segment: Some(segment),
            parent: Some(parent),
            children: vec![],
            path,
        });
        self.nodes[parent.0].children.push(id);

        tracing::debug!(resource = %id, path = %self.nodes[id.0].path, "Added resource");
        Ok(id)
    }

    /// Find the node whose full path equals `path` (template form, e.g. `/products/{id}`).
    pub fn find_by_path(&self, path: &str) -> Option<ResourceId> {
        self.nodes.iter().find(|n| n.path == path).map(|n| n.id)
    }

    /// Match a concrete request path. Literal children win over parameters.
    pub fn match_path(&self, path: &str) -> Option<PathMatch> {
        let mut current = self.root();
        let mut path_parameters = HashMap::new();

        for raw in path.split('/').filter(|s| !s.is_empty()) {
            let node = &self.nodes[current.0];

            let literal = node.children.iter().copied().find(|c| {
                matches!(&self.nodes[c.0].segment, Some(Segment::Literal(s)) if s == raw)
            });

            current = match literal {
                Some(next) => next,
                None => {
                    let param = node.children.iter().copied().find_map(|c| {
                        match &self.nodes[c.0].segment {
                            Some(Segment::Param(name)) => Some((c, name.clone())),
                            _ => None,
                        }
                    })?;
                    path_parameters.insert(param.1, raw.to_string());
                    param.0
                }
            };
        }

        Some(PathMatch {
            resource: current,
            path_parameters,
        })
    }
}
