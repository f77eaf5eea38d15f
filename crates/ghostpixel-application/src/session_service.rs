//! Authenticated identity for the current run.

use ghostpixel_core::error::{GhostError, Result};
use ghostpixel_core::session::{IdentityProvider, Session};
use std::sync::{Arc, Mutex, MutexGuard};

type ChangeCallback = Box<dyn Fn(&Session) + Send + Sync>;

#[derive(Default)]
struct SessionState {
    session: Option<Session>,
    listeners: Vec<ChangeCallback>,
}

/// Holds the session every store path is scoped under.
///
/// A run has at most one transition from unauthenticated to authenticated.
/// There is no logout and no token refresh.
pub struct SessionService {
    provider: Arc<dyn IdentityProvider>,
    state: Mutex<SessionState>,
    /// Serializes sign-in attempts so concurrent callers share one identity.
    sign_in: tokio::sync::Mutex<()>,
}

impl SessionService {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(SessionState::default()),
            sign_in: tokio::sync::Mutex::new(()),
        }
    }

    /// Signs in anonymously, or returns the existing session.
    ///
    /// # Errors
    ///
    /// Returns `GhostError::Auth` if the identity provider is unreachable or
    /// rejects the sign-in. Any other provider failure is reported as `Auth`
    /// as well.
    pub async fn authenticate(&self) -> Result<Session> {
        let _guard = self.sign_in.lock().await;
        if let Some(session) = self.current() {
            return Ok(session);
        }

        let identity = self.provider.sign_in_anonymous().await.map_err(|e| {
            tracing::error!(error = %e, "Anonymous sign-in failed");
            match e {
                GhostError::Auth(_) => e,
                other => GhostError::auth(other.to_string()),
            }
        })?;

        let session = Session::from_identity(identity);
        let listeners = {
            let mut state = self.lock();
            state.session = Some(session.clone());
            std::mem::take(&mut state.listeners)
        };

        tracing::info!(subject_id = %session.subject_id, "Session authenticated");
        for listener in &listeners {
            listener(&session);
        }
        Ok(session)
    }

    /// Registers a callback for the unauthenticated → authenticated transition.
    ///
    /// Registered after the transition, the callback runs immediately, once.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        let existing = {
            let mut state = self.lock();
            if state.session.is_none() {
                state.listeners.push(Box::new(callback));
                return;
            }
            state.session.clone()
        };

        if let Some(session) = existing {
            callback(&session);
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
