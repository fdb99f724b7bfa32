//! Permission checks delegated to the authorization subsystem.
//!
//! The engine never decides who may read a layer; it asks an [`Authorizer`].
//! [`AllowAll`] and [`StaticAcl`] are simple authorizers for embedding and tests.

use std::collections::HashSet;
use std::fmt;

use layerstore_common::Layer;

/// The caller on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    /// Unauthenticated caller.
    Guest,
    /// Authenticated user.
    User(String),
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Guest => write!(f, "guest"),
            Principal::User(name) => write!(f, "{name}"),
        }
    }
}

/// Layer permissions checked by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Read features and field descriptors.
    DataRead,
    /// Change field descriptors.
    DataWrite,
}

impl Permission {
    /// Returns the permission name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::DataRead => "data-read",
            Permission::DataWrite => "data-write",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers permission questions for layers.
pub trait Authorizer: Send + Sync {
    /// Returns `true` if `principal` holds `permission` on `layer`.
    fn has_permission(&self, layer: &dyn Layer, principal: &Principal, permission: Permission)
    -> bool;
}

/// Grants every permission to everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn has_permission(&self, _: &dyn Layer, _: &Principal, _: Permission) -> bool {
        true
    }
}

/// Grants every permission except explicitly denied `(layer, permission)` pairs.
#[derive(Debug, Clone, Default)]
pub struct StaticAcl {
    denied: HashSet<(i64, Permission)>,
}

impl StaticAcl {
    /// Creates an authorizer that grants everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Denies `permission` on the layer with id `layer_id` for every principal.
    #[must_use]
    pub fn deny(mut self, layer_id: i64, permission: Permission) -> Self {
        self.denied.insert((layer_id, permission));
        self
    }
}

impl Authorizer for StaticAcl {
    fn has_permission(&self, layer: &dyn Layer, _: &Principal, permission: Permission) -> bool {
        !self.denied.contains(&(layer.id(), permission))
    }
}
