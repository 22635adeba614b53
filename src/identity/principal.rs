use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};

/// Opaque id of a camera (or anything else a client may be entitled to).
pub type ResourceId = String;

/// Role of an identity. Admins match every resource; clients only their entitlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    Admin,
    Client {
        #[serde(default)]
        entitlements: BTreeSet<ResourceId>,
    },
}

/// Payload-free role discriminant, used for route requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Admin,
    Client,
}

impl RoleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Admin => "admin",
            RoleKind::Client => "client",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(RoleKind::Admin),
            "client" => Some(RoleKind::Client),
            _ => None,
        }
    }
}

impl Role {
    pub fn client<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ResourceId>,
    {
        Role::Client { entitlements: ids.into_iter().map(Into::into).collect() }
    }

    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Admin => RoleKind::Admin,
            Role::Client { .. } => RoleKind::Client,
        }
    }

    pub fn is_admin(&self) -> bool { matches!(self, Role::Admin) }

    /// Whether this role may see a resource keyed by `key`.
    pub fn permits(&self, key: &str) -> bool {
        match self {
            Role::Admin => true,
            Role::Client { entitlements } => entitlements.contains(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn new<S: Into<String>>(id: S, display_name: S, email: S, role: Role) -> Self {
        Self { id: id.into(), display_name: display_name.into(), email: email.into(), role }
    }

    /// Case-insensitive email comparison.
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }

    pub fn entitlements(&self) -> Option<&BTreeSet<ResourceId>> {
        match &self.role {
            Role::Admin => None,
            Role::Client { entitlements } => Some(entitlements),
        }
    }
}
