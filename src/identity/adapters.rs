use serde::{Deserialize, Serialize};
use crate::error::AuthError;

use super::principal::{Identity, Role, RoleKind};

/// On-disk shape of the persisted identity: the dashboard's `currentUser` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default, rename = "assignedCameras", skip_serializing_if = "Option::is_none")]
    pub assigned_cameras: Option<Vec<String>>,
}

pub fn to_stored(identity: &Identity) -> StoredIdentity {
    StoredIdentity {
        id: identity.id.clone(),
        name: identity.display_name.clone(),
        email: identity.email.clone(),
        role: identity.role.kind().as_str().to_string(),
        assigned_cameras: identity.entitlements().map(|e| e.iter().cloned().collect()),
    }
}

/// Validate and convert a stored record. A client without `assignedCameras` gets an
/// empty entitlement set; an admin ignores any list.
pub fn from_stored(stored: StoredIdentity) -> Result<Identity, AuthError> {
    if stored.id.trim().is_empty() {
        return Err(AuthError::MalformedStoredSession("empty id".into()));
    }
    if !stored.email.contains('@') {
        return Err(AuthError::MalformedStoredSession(format!("bad email '{}'", stored.email)));
    }
    let role = match RoleKind::parse(&stored.role) {
        Some(RoleKind::Admin) => Role::Admin,
        Some(RoleKind::Client) => Role::client(stored.assigned_cameras.unwrap_or_default()),
        None => return Err(AuthError::MalformedStoredSession(format!("unknown role '{}'", stored.role))),
    };
    Ok(Identity { id: stored.id, display_name: stored.name, email: stored.email, role })
}

pub fn encode_identity(identity: &Identity) -> Result<String, AuthError> {
    serde_json::to_string(&to_stored(identity)).map_err(|e| AuthError::Storage(e.to_string()))
}

pub fn decode_identity(text: &str) -> Result<Identity, AuthError> {
    let stored: StoredIdentity = serde_json::from_str(text)
        .map_err(|e| AuthError::MalformedStoredSession(e.to_string()))?;
    from_stored(stored)
}
