use chrono::{DateTime, Utc};
use revisor_core::RevisorError;

use crate::provider::{Identity, IdentityProvider};

/// An authorized user session.
///
/// Only [`SessionGate::login`] creates one, so holding a `Session` is proof
/// that the identity provider accepted the user.
#[derive(Clone)]
pub struct Session {
    identity: Identity,
    authenticated_at: DateTime<Utc>,
}

impl Session {
    /// Email of the signed-in user.
    pub fn email(&self) -> &str {
        &self.identity.email
    }

    /// Provider-side user id.
    pub fn user_id(&self) -> &str {
        &self.identity.local_id
    }

    /// Token returned by the identity provider.
    pub fn id_token(&self) -> &str {
        &self.identity.id_token
    }

    /// When the login succeeded.
    pub fn authenticated_at(&self) -> DateTime<Utc> {
        self.authenticated_at
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("email", &self.identity.email)
            .field("authenticated_at", &self.authenticated_at)
            .finish_non_exhaustive()
    }
}

/// Verifies a user's identity before anything else is reachable.
///
/// Holds at most one [`Session`] for the lifetime of the interactive session.
/// A failed attempt never touches the current state.
pub struct SessionGate {
    provider: Box<dyn IdentityProvider>,
    session: Option<Session>,
}

impl SessionGate {
    /// Create a gate in front of `provider`, initially unauthorized.
    pub fn new(provider: impl IdentityProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            session: None,
        }
    }

    /// Attempt a login with `email` and `password`.
    ///
    /// Each call is an independent attempt; there is no retry or lockout.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Unauthorized`] for any failure. The provider's
    /// own error is logged at debug level and never returned.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&Session, RevisorError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            tracing::debug!("login rejected: empty email or password");
            return Err(RevisorError::Unauthorized);
        }

        match self.provider.sign_in(email, password).await {
            Ok(identity) => {
                tracing::info!(email = %identity.email, "login succeeded");
                let session = Session {
                    identity,
                    authenticated_at: Utc::now(),
                };
                Ok(&*self.session.insert(session))
            }
            Err(e) => {
                tracing::debug!(error = %e, "identity provider rejected login");
                Err(RevisorError::Unauthorized)
            }
        }
    }

    /// The current session, if a login succeeded.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Whether a login has succeeded and not been logged out.
    pub fn is_authorized(&self) -> bool {
        self.session.is_some()
    }

    /// End the current session, returning it.
    pub fn logout(&mut self) -> Option<Session> {
        let session = self.session.take();
        if let Some(s) = &session {
            tracing::info!(email = %s.email(), "logged out");
        }
        session
    }
}
