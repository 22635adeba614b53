//! Identity, session and access control for the dashboard.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod provider;
mod adapters;
mod authenticator;
mod authorizer;

pub use principal::{Identity, ResourceId, Role, RoleKind};
pub use session::{LoadingState, Session, SessionContext};
pub use provider::{demo_identities, DirectoryEntry, IdentityDirectory, NewUser, PasswordPolicy, StaticDirectory, UserUpdate};
pub use adapters::{decode_identity, encode_identity, StoredIdentity};
pub use authenticator::Authenticator;
pub use authorizer::{can_view, find_visible, visible_resources, Resource};
