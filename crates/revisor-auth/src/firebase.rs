//! Firebase Authentication (email/password) over the Identity Toolkit REST API.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use revisor_core::RevisorError;
use serde::{Deserialize, Serialize};

use crate::provider::{Identity, IdentityProvider};

/// Firebase web-app configuration, as exported from the Firebase console.
///
/// Only `apiKey` is needed for password sign-in; the remaining fields are
/// accepted so the console export can be used verbatim.
///
/// # Examples
///
/// ```
/// use revisor_auth::firebase::FirebaseConfig;
///
/// let config = FirebaseConfig::from_json(r#"{"apiKey": "AIza-test", "projectId": "demo"}"#).unwrap();
/// assert_eq!(config.api_key, "AIza-test");
/// assert_eq!(config.project_id.as_deref(), Some("demo"));
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseConfig {
    /// Web API key of the Firebase project.
    pub api_key: String,
    /// Auth domain (`<project>.firebaseapp.com`).
    pub auth_domain: Option<String>,
    /// Realtime database URL.
    #[serde(rename = "databaseURL")]
    pub database_url: Option<String>,
    /// Project identifier.
    pub project_id: Option<String>,
    /// Storage bucket name.
    pub storage_bucket: Option<String>,
    /// Cloud messaging sender id.
    pub messaging_sender_id: Option<String>,
    /// App identifier.
    pub app_id: Option<String>,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("project_id", &self.project_id)
            .field("auth_domain", &self.auth_domain)
            .finish_non_exhaustive()
    }
}

impl FirebaseConfig {
    /// Load the configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::FileNotFound`] if `path` does not exist and
    /// [`RevisorError::Config`] if the JSON is malformed or lacks `apiKey`.
    pub fn from_file(path: &Path) -> Result<Self, RevisorError> {
        if !path.exists() {
            return Err(RevisorError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| {
            RevisorError::Config(format!("{}: {e}", path.display()))
        })
    }

    /// Parse the configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Config`] on malformed JSON or an empty `apiKey`.
    pub fn from_json(content: &str) -> Result<Self, RevisorError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| RevisorError::Config(format!("invalid Firebase config: {e}")))?;
        if config.api_key.trim().is_empty() {
            return Err(RevisorError::Config("Firebase config has an empty apiKey".into()));
        }
        Ok(config)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    email: String,
    local_id: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Email/password sign-in against Firebase Authentication.
///
/// # Examples
///
/// ```
/// use revisor_auth::firebase::{FirebaseAuth, FirebaseConfig};
///
/// let config = FirebaseConfig::from_json(r#"{"apiKey": "key"}"#).unwrap();
/// let auth = FirebaseAuth::new(config, "https://identitytoolkit.googleapis.com").unwrap();
/// ```
pub struct FirebaseAuth {
    client: reqwest::Client,
    config: FirebaseConfig,
    identity_url: String,
}

impl FirebaseAuth {
    /// Create a client for the project described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::IdentityProvider`] if the HTTP client cannot be built.
    pub fn new(config: FirebaseConfig, identity_url: &str) -> Result<Self, RevisorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                RevisorError::IdentityProvider(format!("failed to create HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            config,
            identity_url: identity_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, RevisorError> {
        let url = format!("{}/v1/accounts:signInWithPassword", self.identity_url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&SignInRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| RevisorError::IdentityProvider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or(body);
            return Err(RevisorError::IdentityProvider(format!(
                "sign-in rejected ({status}): {reason}"
            )));
        }

        let body: SignInResponse = response.json().await.map_err(|e| {
            RevisorError::IdentityProvider(format!("failed to parse sign-in response: {e}"))
        })?;

        Ok(Identity {
            email: body.email,
            local_id: body.local_id,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in.and_then(|s| s.parse().ok()),
        })
    }
}
