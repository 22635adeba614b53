use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::error::AuthError;
use crate::storage::{SharedStorage, CURRENT_USER_KEY};

use super::adapters::{decode_identity, encode_identity};
use super::principal::Identity;
use super::provider::IdentityDirectory;
use super::session::{Session, SessionContext};

/// Sole writer of the session: restores it from storage, signs identities in and out.
pub struct Authenticator {
    directory: Arc<dyn IdentityDirectory>,
    storage: SharedStorage,
    session: Arc<SessionContext>,
}

impl Authenticator {
    pub fn new(directory: Arc<dyn IdentityDirectory>, storage: SharedStorage, session: Arc<SessionContext>) -> Self {
        Self { directory, storage, session }
    }

    pub fn session(&self) -> &Arc<SessionContext> { &self.session }

    /// Read the persisted identity. Missing or malformed records give an empty session;
    /// a malformed record is also dropped from storage.
    pub fn restore_session(&self) -> Session {
        self.session.mark_pending();
        let restored = match self.storage.get(CURRENT_USER_KEY) {
            Ok(Some(text)) => match decode_identity(&text) {
                Ok(identity) => {
                    debug!(target: "camwatch::auth", "restore_session: restored id={} role={}", identity.id, identity.role.kind().as_str());
                    Session::signed_in(identity)
                }
                Err(e) => {
                    warn!(target: "camwatch::auth", "restore_session: discarding stored session: {e}");
                    if let Err(e) = self.storage.remove(CURRENT_USER_KEY) {
                        warn!(target: "camwatch::auth", "restore_session: could not clear stored session: {e}");
                    }
                    Session::empty()
                }
            },
            Ok(None) => Session::empty(),
            Err(e) => {
                warn!(target: "camwatch::auth", "restore_session: storage read failed: {e}");
                Session::empty()
            }
        };
        self.session.replace(restored.clone());
        restored
    }

    /// Verify credentials, persist the identity and publish it. A failed or superseded
    /// attempt leaves the current session as it was. Among overlapping logins the first
    /// to commit wins; a rejected attempt never cancels one still in flight.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let ticket = self.session.ticket();
        let identity = match self.directory.verify_credentials(email, password).await {
            Ok(identity) => identity,
            Err(e) => {
                info!(target: "camwatch::auth", "login rejected email={} reason={}", email, e.code_str());
                return Err(e);
            }
        };
        let encoded = encode_identity(&identity)?;
        let committed = self.session.commit_with(ticket, Session::signed_in(identity.clone()), || {
            self.storage.set(CURRENT_USER_KEY, &encoded).map_err(|e| AuthError::Storage(e.to_string()))
        })?;
        if !committed {
            info!(target: "camwatch::auth", "login superseded email={} ticket={}", email, ticket);
            return Err(AuthError::Superseded);
        }
        info!(target: "camwatch::auth", "login ok id={} role={}", identity.id, identity.role.kind().as_str());
        Ok(identity)
    }

    /// Clear the stored identity and the session. Idempotent; storage errors are logged only.
    /// Any login still waiting on the directory is superseded.
    pub fn logout(&self) {
        let (was, removed) = self.session.clear_with(|| self.storage.remove(CURRENT_USER_KEY));
        if let Err(e) = removed {
            warn!(target: "camwatch::auth", "logout: could not clear stored session: {e}");
        }
        info!(target: "camwatch::auth", "logout id={}", was.as_ref().map(|i| i.id.as_str()).unwrap_or("<none>"));
    }

    /// Re-read the signed-in identity from the directory so entitlement changes apply
    /// without a new login. An identity that no longer exists is signed out.
    pub async fn refresh_profile(&self) -> Result<Option<Identity>, AuthError> {
        let Some(current) = self.session.snapshot().identity else { return Ok(None) };
        let ticket = self.session.ticket();
        match self.directory.fetch_profile(&current.id).await {
            Ok(identity) => {
                let encoded = encode_identity(&identity)?;
                let committed = self.session.commit_with(ticket, Session::signed_in(identity.clone()), || {
                    self.storage.set(CURRENT_USER_KEY, &encoded).map_err(|e| AuthError::Storage(e.to_string()))
                })?;
                if !committed { return Err(AuthError::Superseded); }
                Ok(Some(identity))
            }
            Err(AuthError::UnknownIdentity(id)) => {
                info!(target: "camwatch::auth", "refresh_profile: identity {} gone, signing out", id);
                self.logout();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::identity::{PasswordPolicy, Role, StaticDirectory, LoadingState};
    use crate::storage::{MemoryStorage, SessionStorage};

    fn setup(storage: SharedStorage) -> Authenticator {
        let dir = StaticDirectory::from_identities(
            PasswordPolicy::Permissive,
            vec![
                Identity::new("1", "Admin", "admin@x.com", Role::Admin),
                Identity::new("2", "Client", "client@x.com", Role::client(["camera-1", "camera-2"])),
            ],
        );
        Authenticator::new(Arc::new(dir), storage, Arc::new(SessionContext::new()))
    }

    #[tokio::test]
    async fn login_then_restore_round_trips() {
        let storage = MemoryStorage::shared();
        let auth = setup(storage.clone());
        let id = auth.login("client@x.com", "pw").await.unwrap();
        // simulate reload: fresh context over the same storage
        let reloaded = setup(storage);
        let s = reloaded.restore_session();
        assert_eq!(s.loading, LoadingState::Resolved);
        assert_eq!(s.identity, Some(id));
    }

    #[tokio::test]
    async fn logout_then_restore_is_empty() {
        let storage = MemoryStorage::shared();
        let auth = setup(storage.clone());
        auth.login("admin@x.com", "pw").await.unwrap();
        auth.logout();
        auth.logout();
        assert_eq!(auth.session().snapshot(), Session::empty());
        assert_eq!(setup(storage).restore_session(), Session::empty());
    }

    #[tokio::test]
    async fn failed_login_keeps_prior_session() {
        let auth = setup(MemoryStorage::shared());
        auth.login("admin@x.com", "pw").await.unwrap();
        assert_eq!(auth.login("unknown@x.com", "x").await, Err(AuthError::InvalidCredentials));
        assert!(auth.session().snapshot().is_admin());
    }

    #[test]
    fn malformed_storage_restores_empty_and_is_cleared() {
        let storage = MemoryStorage::shared();
        storage.set(CURRENT_USER_KEY, "{\"id\": 7").unwrap();
        let auth = setup(storage.clone());
        assert_eq!(auth.restore_session(), Session::empty());
        assert_eq!(storage.get(CURRENT_USER_KEY).unwrap(), None);
    }

    #[test]
    fn restore_resolves_pending() {
        let auth = setup(MemoryStorage::shared());
        assert!(auth.session().snapshot().is_pending());
        auth.restore_session();
        assert!(!auth.session().snapshot().is_pending());
    }

    /// Parks `admin*` logins until `gate` is notified; `entered` fires once one is parked.
    struct SlowDirectory {
        inner: StaticDirectory,
        entered: tokio::sync::Notify,
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl IdentityDirectory for SlowDirectory {
        async fn verify_credentials(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
            if email.starts_with("admin") {
                self.entered.notify_one();
                self.gate.notified().await;
            }
            self.inner.verify_credentials(email, password).await
        }
        async fn fetch_profile(&self, id: &str) -> Result<Identity, AuthError> {
            self.inner.fetch_profile(id).await
        }
    }

    fn slow_setup() -> (Arc<SlowDirectory>, SharedStorage, Arc<Authenticator>) {
        let dir = Arc::new(SlowDirectory {
            inner: StaticDirectory::from_identities(
                PasswordPolicy::Permissive,
                vec![
                    Identity::new("1", "Admin", "admin@x.com", Role::Admin),
                    Identity::new("2", "Client", "client@x.com", Role::client(["camera-1"])),
                ],
            ),
            entered: tokio::sync::Notify::new(),
            gate: tokio::sync::Notify::new(),
        });
        let storage = MemoryStorage::shared();
        let auth = Arc::new(Authenticator::new(dir.clone(), storage.clone(), Arc::new(SessionContext::new())));
        (dir, storage, auth)
    }

    fn stored(storage: &SharedStorage) -> Option<Identity> {
        storage.get(CURRENT_USER_KEY).unwrap().map(|t| decode_identity(&t).unwrap())
    }

    #[tokio::test]
    async fn superseded_login_does_not_overwrite_newer_one() {
        let (dir, storage, auth) = slow_setup();
        let slow = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.login("admin@x.com", "pw").await })
        };
        dir.entered.notified().await;
        let fast = auth.login("client@x.com", "pw").await.unwrap();
        dir.gate.notify_one();
        assert_eq!(slow.await.unwrap(), Err(AuthError::Superseded));

        assert_eq!(auth.session().snapshot().identity, Some(fast.clone()));
        assert_eq!(stored(&storage), Some(fast));
    }

    #[tokio::test]
    async fn rejected_login_does_not_cancel_inflight_login() {
        let (dir, storage, auth) = slow_setup();
        let slow = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.login("admin@x.com", "pw").await })
        };
        dir.entered.notified().await;
        assert_eq!(auth.login("typo@x.com", "pw").await, Err(AuthError::InvalidCredentials));
        dir.gate.notify_one();
        let admin = slow.await.unwrap().unwrap();
        assert!(auth.session().snapshot().is_admin());
        assert_eq!(stored(&storage), Some(admin));
    }

    #[tokio::test]
    async fn logout_supersedes_inflight_login() {
        let (dir, storage, auth) = slow_setup();
        auth.login("client@x.com", "pw").await.unwrap();
        let slow = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.login("admin@x.com", "pw").await })
        };
        dir.entered.notified().await;
        auth.logout();
        dir.gate.notify_one();
        assert_eq!(slow.await.unwrap(), Err(AuthError::Superseded));
        assert_eq!(auth.session().snapshot(), Session::empty());
        assert_eq!(stored(&storage), None);
    }

    /// Starts a login on another thread while logout is removing the stored record.
    #[derive(Default)]
    struct InterleavingStorage {
        inner: MemoryStorage,
        during_remove: parking_lot::Mutex<Option<Box<dyn FnOnce() -> std::thread::JoinHandle<()> + Send>>>,
        spawned: parking_lot::Mutex<Option<std::thread::JoinHandle<()>>>,
    }

    impl SessionStorage for InterleavingStorage {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> { self.inner.get(key) }
        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> { self.inner.set(key, value) }
        fn remove(&self, key: &str) -> anyhow::Result<()> {
            let hook = self.during_remove.lock().take();
            if let Some(hook) = hook {
                let handle = hook();
                // give the other thread time to reach the session
                std::thread::sleep(std::time::Duration::from_millis(20));
                *self.spawned.lock() = Some(handle);
            }
            self.inner.remove(key)
        }
    }

    #[test]
    fn login_during_logout_keeps_storage_and_session_in_step() {
        let storage = Arc::new(InterleavingStorage::default());
        let auth = Arc::new(setup(storage.clone()));
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(auth.login("client@x.com", "pw")).unwrap();

        let racer = auth.clone();
        *storage.during_remove.lock() = Some(Box::new(move || {
            std::thread::spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                rt.block_on(racer.login("admin@x.com", "pw")).unwrap();
            })
        }));
        auth.logout();
        storage.spawned.lock().take().unwrap().join().unwrap();

        // the racing login lands after the sign-out, never between its steps
        let session = auth.session().snapshot().identity;
        let persisted = storage.get(CURRENT_USER_KEY).unwrap().map(|t| decode_identity(&t).unwrap());
        assert_eq!(session, persisted);
        assert!(session.unwrap().role.is_admin());
    }

    #[tokio::test]
    async fn refresh_profile_picks_up_new_entitlements() {
        let dir = Arc::new(StaticDirectory::from_identities(
            PasswordPolicy::Permissive,
            vec![Identity::new("2", "Client", "client@x.com", Role::client(["camera-1", "camera-2"]))],
        ));
        let auth = Authenticator::new(dir.clone(), MemoryStorage::shared(), Arc::new(SessionContext::new()));
        auth.login("client@x.com", "pw").await.unwrap();
        dir.assign_cameras("2", ["camera-2".to_string()].into_iter().collect()).unwrap();
        let refreshed = auth.refresh_profile().await.unwrap().unwrap();
        assert!(!refreshed.role.permits("camera-1"));
        dir.remove_user("2").unwrap();
        assert_eq!(auth.refresh_profile().await.unwrap(), None);
        assert_eq!(auth.session().snapshot(), Session::empty());
    }
}
