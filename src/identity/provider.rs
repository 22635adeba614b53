use std::collections::BTreeSet;
use async_trait::async_trait;
use parking_lot::RwLock;
use crate::error::{AppError, AppResult, AuthError};
use crate::tprintln;

use super::principal::{Identity, ResourceId, Role};

/// Source of truth for who may sign in. Either the in-memory `StaticDirectory` or a
/// remote auth service wrapped behind the same two calls.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn fetch_profile(&self, id: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordPolicy {
    /// Password must verify against the identity's stored secret.
    Strict,
    /// Any non-empty password is accepted for a known email.
    #[default]
    Permissive,
}

impl PasswordPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(PasswordPolicy::Strict),
            "permissive" | "demo" => Some(PasswordPolicy::Permissive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub identity: Identity,
    /// Argon2 PHC string; `None` means the identity cannot pass strict verification.
    pub secret_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

pub struct StaticDirectory {
    policy: PasswordPolicy,
    entries: RwLock<Vec<DirectoryEntry>>,
}

/// The dashboard's built-in accounts.
pub fn demo_identities() -> Vec<Identity> {
    vec![
        Identity::new("1", "Admin User", "admin@guardian-eye.com", Role::Admin),
        Identity::new("2", "Client Demo", "client@example.com", Role::client(["camera-1", "camera-2"])),
        Identity::new("3", "Building Manager", "manager@example.org", Role::client(["camera-3", "camera-4"])),
        Identity::new("4", "Security Officer", "security@example.net", Role::client(["camera-5"])),
        Identity::new("5", "System Admin", "sysadmin@guardian-eye.com", Role::Admin),
    ]
}

fn validate_email(email: &str) -> AppResult<()> {
    let e = email.trim();
    if e.is_empty() || !e.contains('@') {
        return Err(AppError::user("invalid_email", "email must be a non-empty address"));
    }
    Ok(())
}

fn hash_secret(password: &str) -> AppResult<String> {
    if password.is_empty() {
        return Err(AppError::user("invalid_password", "password must not be empty"));
    }
    Ok(crate::security::hash_password(password)?)
}

impl StaticDirectory {
    pub fn new(policy: PasswordPolicy, entries: Vec<DirectoryEntry>) -> Self {
        Self { policy, entries: RwLock::new(entries) }
    }

    /// Identities without secrets; only useful under `PasswordPolicy::Permissive`
    /// unless secrets are set afterwards.
    pub fn from_identities(policy: PasswordPolicy, identities: Vec<Identity>) -> Self {
        let entries = identities.into_iter().map(|identity| DirectoryEntry { identity, secret_hash: None }).collect();
        Self::new(policy, entries)
    }

    /// Built-in accounts. With `shared_secret` every account gets that password hashed.
    pub fn demo(policy: PasswordPolicy, shared_secret: Option<&str>) -> anyhow::Result<Self> {
        let mut entries = Vec::new();
        for identity in demo_identities() {
            let secret_hash = match shared_secret {
                Some(pw) => Some(crate::security::hash_password(pw)?),
                None => None,
            };
            entries.push(DirectoryEntry { identity, secret_hash });
        }
        Ok(Self::new(policy, entries))
    }

    pub fn policy(&self) -> PasswordPolicy { self.policy }

    pub fn list(&self) -> Vec<Identity> {
        self.entries.read().iter().map(|e| e.identity.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<Identity> {
        self.entries.read().iter().find(|e| e.identity.id == id).map(|e| e.identity.clone())
    }

    pub fn find_by_email(&self, email: &str) -> Option<Identity> {
        self.entries.read().iter().find(|e| e.identity.email_matches(email)).map(|e| e.identity.clone())
    }

    fn next_id(entries: &[DirectoryEntry]) -> String {
        let max = entries.iter().filter_map(|e| e.identity.id.parse::<u64>().ok()).max().unwrap_or(0);
        (max + 1).to_string()
    }

    pub fn add_user(&self, user: NewUser) -> AppResult<Identity> {
        validate_email(&user.email)?;
        if user.display_name.trim().is_empty() {
            return Err(AppError::user("invalid_name", "display name must not be empty"));
        }
        // hash outside the lock; argon2 is slow
        let secret_hash = match user.password.as_deref() {
            Some(pw) => Some(hash_secret(pw)?),
            None => None,
        };
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.identity.email_matches(&user.email)) {
            return Err(AppError::conflict("duplicate_email".to_string(), format!("email already registered: {}", user.email)));
        }
        let identity = Identity {
            id: Self::next_id(&entries),
            display_name: user.display_name.trim().to_string(),
            email: user.email.trim().to_string(),
            role: user.role,
        };
        entries.push(DirectoryEntry { identity: identity.clone(), secret_hash });
        tprintln!("directory.add id={} email={}", identity.id, identity.email);
        Ok(identity)
    }

    pub fn update_user(&self, id: &str, update: UserUpdate) -> AppResult<Identity> {
        if let Some(email) = update.email.as_deref() { validate_email(email)?; }
        let mut entries = self.entries.write();
        if let Some(email) = update.email.as_deref() {
            if entries.iter().any(|e| e.identity.id != id && e.identity.email_matches(email)) {
                return Err(AppError::conflict("duplicate_email".to_string(), format!("email already registered: {email}")));
            }
        }
        let entry = entries
            .iter_mut()
            .find(|e| e.identity.id == id)
            .ok_or_else(|| AppError::not_found("user_not_found".to_string(), format!("no user with id {id}")))?;
        if let Some(name) = update.display_name { entry.identity.display_name = name.trim().to_string(); }
        if let Some(email) = update.email { entry.identity.email = email.trim().to_string(); }
        if let Some(role) = update.role { entry.identity.role = role; }
        Ok(entry.identity.clone())
    }

    pub fn set_password(&self, id: &str, password: &str) -> AppResult<()> {
        let hash = hash_secret(password)?;
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.identity.id == id)
            .ok_or_else(|| AppError::not_found("user_not_found".to_string(), format!("no user with id {id}")))?;
        entry.secret_hash = Some(hash);
        Ok(())
    }

    pub fn remove_user(&self, id: &str) -> AppResult<Identity> {
        let mut entries = self.entries.write();
        let pos = entries
            .iter()
            .position(|e| e.identity.id == id)
            .ok_or_else(|| AppError::not_found("user_not_found".to_string(), format!("no user with id {id}")))?;
        let removed = entries.remove(pos);
        tprintln!("directory.remove id={}", id);
        Ok(removed.identity)
    }

    /// Replace a client's camera entitlements. Admins already see everything.
    pub fn assign_cameras(&self, id: &str, cameras: BTreeSet<ResourceId>) -> AppResult<Identity> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.identity.id == id)
            .ok_or_else(|| AppError::not_found("user_not_found".to_string(), format!("no user with id {id}")))?;
        match &mut entry.identity.role {
            Role::Admin => Err(AppError::user("admin_has_all_cameras", "cameras cannot be assigned to an admin")),
            Role::Client { entitlements } => {
                *entitlements = cameras;
                Ok(entry.identity.clone())
            }
        }
    }

    /// Entitle a client to one more camera. Returns the updated identity.
    pub fn grant_camera(&self, id: &str, camera: &str) -> AppResult<Identity> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.identity.id == id)
            .ok_or_else(|| AppError::not_found("user_not_found".to_string(), format!("no user with id {id}")))?;
        match &mut entry.identity.role {
            Role::Admin => Err(AppError::user("admin_has_all_cameras", "cameras cannot be assigned to an admin")),
            Role::Client { entitlements } => {
                entitlements.insert(camera.to_string());
                Ok(entry.identity.clone())
            }
        }
    }

    /// Drop a deleted camera from every client's entitlements. Returns the ids of the
    /// clients that lost it.
    pub fn revoke_camera(&self, camera: &str) -> Vec<String> {
        let mut touched = Vec::new();
        for entry in self.entries.write().iter_mut() {
            if let Role::Client { entitlements } = &mut entry.identity.role {
                if entitlements.remove(camera) { touched.push(entry.identity.id.clone()); }
            }
        }
        tprintln!("directory.revoke camera={} clients={:?}", camera, touched);
        touched
    }
}

#[async_trait]
impl IdentityDirectory for StaticDirectory {
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let Some(entry) = self.entries.read().iter().find(|e| e.identity.email_matches(email)).cloned() else {
            return Err(AuthError::InvalidCredentials);
        };
        let accepted = match self.policy {
            PasswordPolicy::Permissive => !password.is_empty(),
            PasswordPolicy::Strict => entry
                .secret_hash
                .as_deref()
                .map(|phc| crate::security::verify_password(phc, password))
                .unwrap_or(false),
        };
        if !accepted { return Err(AuthError::InvalidCredentials); }
        Ok(entry.identity)
    }

    async fn fetch_profile(&self, id: &str) -> Result<Identity, AuthError> {
        self.get(id).ok_or_else(|| AuthError::UnknownIdentity(id.to_string()))
    }
}
