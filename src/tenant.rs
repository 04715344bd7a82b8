//! Tenant keys and artifact addressing
//!
//! Every event (tenant) owns an isolated namespace of derived artifacts in
//! the resource cache. The namespace is addressed by a [`TenantKey`]; the
//! individual artifacts by an [`ArtifactKey`] combining the tenant with an
//! [`ArtifactKind`], so one flat store can hold every namespace.

use std::fmt;

/// Identifies one event's namespace
///
/// The "no name supplied" case is a dedicated variant rather than a magic
/// string: tenant names are caller-controlled input, so no string value
/// could be guaranteed collision-free. Equality and hashing are structural,
/// which makes two lookups with the same supplied name (or both without a
/// name) resolve to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantKey {
    /// A caller-supplied, non-empty event name
    Named(String),
    /// The event flagged as the process-wide default
    Default,
}

impl TenantKey {
    /// Map an optional caller-supplied name to a key
    ///
    /// An absent or empty name resolves to [`TenantKey::Default`]; anything
    /// else resolves to [`TenantKey::Named`].
    pub fn resolve(name: Option<&str>) -> Self {
        match name {
            Some(n) if !n.is_empty() => TenantKey::Named(n.to_owned()),
            _ => TenantKey::Default,
        }
    }

    /// Whether this key addresses the default event
    pub fn is_default(&self) -> bool {
        matches!(self, TenantKey::Default)
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantKey::Named(name) => f.write_str(name),
            TenantKey::Default => f.write_str("(default event)"),
        }
    }
}

/// The kinds of derived artifact an event namespace can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Event configuration fetched from the content source
    EventData,
    /// Serialized description of the event's derived schema shape
    SchemaIntrospection,
    /// The unit that services inbound GraphQL requests for the event
    RequestHandler,
}

/// Composite store key: one artifact within one event namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub tenant: TenantKey,
    pub kind: ArtifactKind,
}

impl ArtifactKey {
    pub fn new(tenant: TenantKey, kind: ArtifactKind) -> Self {
        Self { tenant, kind }
    }
}


#[cfg(test)]
mod proptest_checks {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn distinct_names_never_collide(
            a in "[a-zA-Z0-9_-]{1,24}",
            b in "[a-zA-Z0-9_-]{1,24}",
        ) {
            let ka = TenantKey::resolve(Some(&a));
            let kb = TenantKey::resolve(Some(&b));
            prop_assert_eq!(a == b, ka == kb);
        }

        #[test]
        fn named_keys_never_equal_the_default(name in "[a-zA-Z0-9_-]{1,24}") {
            prop_assert_ne!(TenantKey::resolve(Some(&name)), TenantKey::Default);
        }

        #[test]
        fn resolution_is_idempotent(name in "[a-zA-Z0-9_-]{0,24}") {
            let opt = if name.is_empty() { None } else { Some(name.as_str()) };
            prop_assert_eq!(TenantKey::resolve(opt), TenantKey::resolve(opt));
        }
    }
}
