use parking_lot::RwLock;
use serde::Serialize;
use crate::tprintln;

use super::principal::{Identity, RoleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingState {
    Pending,
    Resolved,
}

/// Snapshot of who is signed in. Readers always get a whole value, never a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub identity: Option<Identity>,
    pub loading: LoadingState,
}

impl Session {
    /// Process-start state: nobody signed in, restore not yet run.
    pub fn pending() -> Self { Self { identity: None, loading: LoadingState::Pending } }
    pub fn empty() -> Self { Self { identity: None, loading: LoadingState::Resolved } }
    pub fn signed_in(identity: Identity) -> Self { Self { identity: Some(identity), loading: LoadingState::Resolved } }

    pub fn is_pending(&self) -> bool { self.loading == LoadingState::Pending }
    pub fn role_kind(&self) -> Option<RoleKind> { self.identity.as_ref().map(|i| i.role.kind()) }
    pub fn is_admin(&self) -> bool { self.identity.as_ref().map(|i| i.role.is_admin()).unwrap_or(false) }
}

#[derive(Debug)]
struct Inner {
    session: Session,
    // bumped by every successful commit and by every clear; a write commits only if
    // nothing was published since it took its ticket
    generation: u64,
}

/// Owned holder of the process-wide session. Only the authenticator writes to it;
/// the access filter and route guard read snapshots.
#[derive(Debug)]
pub struct SessionContext {
    inner: RwLock<Inner>,
}

impl Default for SessionContext {
    fn default() -> Self { Self::new() }
}

impl SessionContext {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner { session: Session::pending(), generation: 0 }) }
    }

    pub fn snapshot(&self) -> Session { self.inner.read().session.clone() }

    pub fn generation(&self) -> u64 { self.inner.read().generation }

    pub(crate) fn mark_pending(&self) {
        self.inner.write().session.loading = LoadingState::Pending;
    }

    /// Observe the current generation. A write holding this ticket is superseded by any
    /// commit or clear that lands before it; taking a ticket invalidates nobody.
    pub(crate) fn ticket(&self) -> u64 { self.inner.read().generation }

    /// Run `persist` and publish `session` atomically, provided `ticket` is still current.
    /// Returns `Ok(false)` without side effects when another write landed first.
    pub(crate) fn commit_with<E>(
        &self,
        ticket: u64,
        session: Session,
        persist: impl FnOnce() -> Result<(), E>,
    ) -> Result<bool, E> {
        let mut g = self.inner.write();
        if g.generation != ticket {
            tprintln!("session.commit stale ticket={} current={}", ticket, g.generation);
            return Ok(false);
        }
        persist()?;
        g.session = session;
        g.generation += 1;
        Ok(true)
    }

    /// Sign out under one write lock: stale every outstanding ticket, run `persist` and
    /// publish the empty session. The session is cleared even when `persist` fails; the
    /// error is handed back so the caller can report it. Returns the identity that was
    /// signed in.
    pub(crate) fn clear_with<E>(&self, persist: impl FnOnce() -> Result<(), E>) -> (Option<Identity>, Result<(), E>) {
        let mut g = self.inner.write();
        g.generation += 1;
        let persisted = persist();
        let was = std::mem::replace(&mut g.session, Session::empty()).identity;
        (was, persisted)
    }

    /// Unconditional replace; used by restore, which runs before any login.
    pub(crate) fn replace(&self, session: Session) {
        self.inner.write().session = session;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;

    fn admin() -> Identity { Identity::new("1", "Admin User", "admin@x.com", Role::Admin) }

    #[test]
    fn starts_pending_and_empty() {
        let ctx = SessionContext::new();
        let s = ctx.snapshot();
        assert!(s.is_pending());
        assert!(s.identity.is_none());
        assert_eq!(s.role_kind(), None);
    }

    #[test]
    fn stale_ticket_does_not_commit() {
        let ctx = SessionContext::new();
        let first = ctx.ticket();
        let second = ctx.ticket();
        assert!(ctx.commit_with::<()>(second, Session::signed_in(admin()), || Ok(())).unwrap());
        let mut persisted = false;
        let ok = ctx.commit_with::<()>(first, Session::empty(), || { persisted = true; Ok(()) }).unwrap();
        assert!(!ok);
        assert!(!persisted);
        assert!(ctx.snapshot().is_admin());
    }

    #[test]
    fn taking_a_ticket_invalidates_nobody() {
        let ctx = SessionContext::new();
        let t = ctx.ticket();
        let _ = ctx.ticket();
        assert_eq!(ctx.generation(), t);
        assert!(ctx.commit_with::<()>(t, Session::signed_in(admin()), || Ok(())).unwrap());
    }

    #[test]
    fn clear_stales_outstanding_tickets() {
        let ctx = SessionContext::new();
        let t = ctx.ticket();
        assert!(ctx.commit_with::<()>(t, Session::signed_in(admin()), || Ok(())).unwrap());
        let pending = ctx.ticket();
        let mut cleared = false;
        let (was, r) = ctx.clear_with::<()>(|| { cleared = true; Ok(()) });
        assert!(cleared);
        assert_eq!(r, Ok(()));
        assert_eq!(was, Some(admin()));
        assert_eq!(ctx.snapshot(), Session::empty());
        assert!(!ctx.commit_with::<()>(pending, Session::signed_in(admin()), || Ok(())).unwrap());
        assert_eq!(ctx.snapshot(), Session::empty());
    }

    #[test]
    fn clear_publishes_empty_even_if_persist_fails() {
        let ctx = SessionContext::new();
        let t = ctx.ticket();
        ctx.commit_with::<()>(t, Session::signed_in(admin()), || Ok(())).unwrap();
        let (_, r) = ctx.clear_with(|| Err("disk"));
        assert_eq!(r, Err("disk"));
        assert_eq!(ctx.snapshot(), Session::empty());
    }

    #[test]
    fn failed_persist_leaves_session_untouched() {
        let ctx = SessionContext::new();
        ctx.replace(Session::empty());
        let t = ctx.ticket();
        let r = ctx.commit_with(t, Session::signed_in(admin()), || Err("disk"));
        assert_eq!(r, Err("disk"));
        assert_eq!(ctx.snapshot(), Session::empty());
        // a failed commit does not consume the ticket
        assert_eq!(ctx.generation(), t);
    }
}
