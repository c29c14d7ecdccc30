//! Session and connectivity state shared with the auth layer.
//!
//! The (external) auth and platform layers write into this handle; the sync
//! core reads it through the [`SessionProvider`] and [`ConnectivityProbe`]
//! ports. A fresh handle reports online; the platform connectivity callback
//! overrides it.

use std::sync::{Arc, RwLock};

use moneta_core::records::OwnerId;
use moneta_core::sync::{ConnectivityProbe, Session, SessionProvider};

/// The signed-in user plus their API credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub owner_id: OwnerId,
    pub access_token: String,
}

struct SessionState {
    session: Option<AuthSession>,
    online: bool,
}

#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<RwLock<SessionState>>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("online", &self.read().online)
            .field("signed_in", &self.read().session.is_some())
            .finish()
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState {
                session: None,
                online: true,
            })),
        }
    }

    pub fn set_session(&self, session: AuthSession) {
        self.write().session = Some(session);
    }

    pub fn clear_session(&self) {
        self.write().session = None;
    }

    pub fn set_online(&self, online: bool) {
        self.write().online = online;
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().session.as_ref().map(|s| s.access_token.clone())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider for SessionHandle {
    fn current_session(&self) -> Option<Session> {
        self.read().session.as_ref().map(|s| Session {
            owner_id: s.owner_id.clone(),
        })
    }
}

impl ConnectivityProbe for SessionHandle {
    fn is_online(&self) -> bool {
        self.read().online
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_round_trip() {
        let handle = SessionHandle::new();
        assert!(handle.current_session().is_none());
        assert!(handle.access_token().is_none());
        assert!(handle.is_online());

        handle.set_session(AuthSession {
            owner_id: OwnerId::from("user_1"),
            access_token: "token".to_string(),
        });
        assert_eq!(
            handle.current_session().unwrap().owner_id,
            OwnerId::from("user_1")
        );
        assert_eq!(handle.access_token().as_deref(), Some("token"));

        handle.set_online(false);
        assert!(!handle.is_online());

        handle.clear_session();
        assert!(handle.current_session().is_none());
    }
}
