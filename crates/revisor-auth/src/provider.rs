use async_trait::async_trait;
use revisor_core::RevisorError;

/// Identity returned by a successful sign-in.
#[derive(Clone)]
pub struct Identity {
    /// Email the provider authenticated.
    pub email: String,
    /// Provider-side user id.
    pub local_id: String,
    /// Bearer token proving the sign-in.
    pub id_token: String,
    /// Token to renew `id_token`, when issued.
    pub refresh_token: Option<String>,
    /// Lifetime of `id_token` in seconds.
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("email", &self.email)
            .field("local_id", &self.local_id)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// An external service that verifies email/password credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify the credentials and return the authenticated identity.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::IdentityProvider`] (or a transport error) when
    /// the credentials are rejected or the provider is unreachable.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, RevisorError>;
}
