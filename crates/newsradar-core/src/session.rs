//! Session gate: the client's view of who is signed in.
//!
//! Starts out [`AuthStatus::Unknown`]. A [`refresh`](SessionGate::refresh)
//! asks the backend for the current user; any failure is read as "not
//! signed in" rather than surfaced, matching how the session endpoint
//! answers anonymous callers.

use std::sync::RwLock;

use tracing::{debug, info};

use crate::backend::Backend;
use crate::error::{CoreError, CoreResult};
use crate::models::{AuthStatus, CurrentUser};
use crate::sync::{read, write, Generation};

#[derive(Debug, Clone, Default, PartialEq)]
struct Session {
    status: AuthStatus,
    user: Option<CurrentUser>,
}

#[derive(Default)]
pub struct SessionGate {
    session: RwLock<Session>,
    checks: Generation,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> AuthStatus {
        read(&self.session).status
    }

    /// `None` until the first check resolves.
    pub fn is_authenticated(&self) -> Option<bool> {
        self.status().as_flag()
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        read(&self.session).user.clone()
    }

    /// Re-check the session. Returns `true` if the auth status changed.
    pub async fn refresh(&self, backend: &dyn Backend) -> bool {
        let ticket = self.checks.issue();
        let user = match backend.current_user().await {
            Ok(user) => Some(user),
            Err(err) => {
                debug!(error = %err, "session check failed; treating as anonymous");
                None
            }
        };
        if !self.checks.is_current(ticket) {
            return false;
        }
        let status = AuthStatus::from_flag(Some(user.is_some()));
        self.apply(status, user)
    }

    /// Sign out. The local session becomes anonymous only once the backend
    /// confirms.
    pub async fn logout(&self, backend: &dyn Backend) -> CoreResult<bool> {
        backend.logout().await.map_err(CoreError::backend)?;
        self.checks.issue();
        Ok(self.apply(AuthStatus::Anonymous, None))
    }

    /// Ask the backend to email a sign-in link to `email`.
    pub async fn request_magic_link(
        &self,
        backend: &dyn Backend,
        email: &str,
        redirect_url: Option<&str>,
    ) -> CoreResult<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(CoreError::validation("Email is required."));
        }
        backend
            .request_magic_link(email, redirect_url)
            .await
            .map_err(CoreError::backend)?;
        info!(email, "magic link requested");
        Ok(())
    }

    fn apply(&self, status: AuthStatus, user: Option<CurrentUser>) -> bool {
        let mut session = write(&self.session);
        let changed = session.status != status;
        if changed {
            info!(
                from = ?session.status,
                to = ?status,
                user = user.as_ref().map(|u| u.username.as_str()),
                "auth status changed"
            );
        }
        *session = Session { status, user };
        changed
    }
}
