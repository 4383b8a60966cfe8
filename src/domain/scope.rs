//! OAuth scope references and the scope lattice

use super::realm::{IdentityRealm, RealmKind};
use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A scope namespaced by its resource-server identifier (e.g. `admin/web`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeRef {
    pub resource_server: String,
    pub name: String,
}

impl ScopeRef {
    pub fn new(resource_server: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_server: resource_server.into(),
            name: name.into(),
        }
    }

    /// Parse `<resource-server>/<scope>`. Both halves must be non-empty.
    pub fn parse(s: &str) -> Result<Self, BuildError> {
        match s.split_once('/') {
            Some((server, name))
                if !server.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(server, name))
            }
            _ => Err(BuildError::MalformedScope(s.to_string())),
        }
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_server, self.name)
    }
}

impl TryFrom<String> for ScopeRef {
    type Error = BuildError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ScopeRef::parse(&value)
    }
}

impl From<ScopeRef> for String {
    fn from(scope: ScopeRef) -> Self {
        scope.to_string()
    }
}

/// One lattice entry: a declared scope and the realm that issues it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeEntry {
    pub realm: RealmKind,
    pub scope: ScopeRef,
}

/// Deduplicated set of every scope the realms declare.
///
/// Method bindings may only reference scopes present here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScopeLattice {
    entries: BTreeSet<ScopeEntry>,
    #[serde(skip)]
    servers: BTreeMap<String, RealmKind>,
}

impl ScopeLattice {
    /// Collect the scopes of each realm's resource server.
    pub fn from_realms<'a>(
        realms: impl IntoIterator<Item = &'a IdentityRealm>,
    ) -> Result<Self, BuildError> {
        let mut lattice = ScopeLattice::default();

        for realm in realms {
            let identifier = &realm.resource_server().identifier;
            match lattice.servers.get(identifier) {
                Some(owner) if *owner != realm.kind => {
                    return Err(BuildError::DuplicateResourceServer(identifier.clone()));
                }
                _ => {
                    lattice.servers.insert(identifier.clone(), realm.kind);
                }
            }

            for scope in &realm.resource_server().scopes {
                lattice.entries.insert(ScopeEntry {
                    realm: realm.kind,
                    scope: ScopeRef::new(identifier.clone(), scope.name.clone()),
                });
            }
        }

        Ok(lattice)
    }

    /// Resolve a scope string to its lattice entry.
    pub fn resolve(&self, scope: &str) -> Result<ScopeEntry, BuildError> {
        let scope = ScopeRef::parse(scope)?;
        let realm = self
            .servers
            .get(&scope.resource_server)
            .copied()
            .ok_or_else(|| BuildError::UndeclaredScope(scope.to_string()))?;

        let entry = ScopeEntry { realm, scope };
        if self.entries.contains(&entry) {
            Ok(entry)
        } else {
            Err(BuildError::UndeclaredScope(entry.scope.to_string()))
        }
    }

    pub fn contains(&self, scope: &ScopeRef) -> bool {
        self.entries.iter().any(|entry| &entry.scope == scope)
    }

    /// Realm owning a resource-server identifier.
    pub fn realm_of(&self, resource_server: &str) -> Option<RealmKind> {
        self.servers.get(resource_server).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ScopeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parse() {
        let scope = ScopeRef::parse("customer/mobile").unwrap();
        assert_eq!(scope.resource_server, "customer");
        assert_eq!(scope.name, "mobile");
        assert_eq!(scope.to_string(), "customer/mobile");
    }

    #[test]
    fn test_scope_parse_rejects_bare_name() {
        assert!(matches!(
            ScopeRef::parse("web"),
            Err(BuildError::MalformedScope(_))
        ));
        assert!(ScopeRef::parse("/web").is_err());
        assert!(ScopeRef::parse("admin/").is_err());
        assert!(ScopeRef::parse("admin/web/extra").is_err());
    }

    #[test]
    fn test_scope_serde_as_string() {
        let scope = ScopeRef::new("admin", "web");
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, "\"admin/web\"");

        let back: ScopeRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scope);
    }
}
