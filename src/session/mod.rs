//! Signed-in identity tracking
//!
//! [`SessionManager`] owns the current identity for the lifetime of the
//! process and broadcasts every change, so the shell can swap between the
//! sign-in gate and the pantry view.

use crate::error::{PantryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

pub mod auth;
pub use auth::{AuthProvider, LocalAuthProvider};

/// Identity issued by the authentication provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Stable account id; all inventory is scoped under it
    pub user_id: String,
    /// Account email
    pub email: String,
    /// Opaque token for this sign-in
    pub token: String,
    /// When the session was created
    pub signed_in_at: DateTime<Utc>,
}

impl UserSession {
    /// Create a session with a fresh token
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            token: uuid::Uuid::new_v4().to_string(),
            signed_in_at: Utc::now(),
        }
    }
}

/// Tracks who is signed in
pub struct SessionManager {
    provider: Arc<dyn AuthProvider>,
    state: watch::Sender<Option<UserSession>>,
}

impl SessionManager {
    /// Create a manager with nobody signed in
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        let (state, _) = watch::channel(None);
        Self { provider, state }
    }

    /// Sign in with email and password
    ///
    /// # Errors
    ///
    /// Returns the provider's message on failure; the current identity is
    /// left unchanged
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession> {
        let session = self.provider.sign_in(email, password).await.map_err(|e| {
            tracing::warn!(email = %email, "Sign-in failed: {}", e);
            e
        })?;

        tracing::info!(user_id = %session.user_id, "Signed in");
        self.state.send_replace(Some(session.clone()));
        Ok(session)
    }

    /// Create an account and sign it in
    ///
    /// A password that differs from its confirmation is rejected before the
    /// provider is contacted.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<UserSession> {
        if password != confirm_password {
            return Err(PantryError::Auth("Passwords do not match".to_string()).into());
        }

        let session = self.provider.sign_up(email, password).await.map_err(|e| {
            tracing::warn!(email = %email, "Sign-up failed: {}", e);
            e
        })?;

        tracing::info!(user_id = %session.user_id, "Account created");
        self.state.send_replace(Some(session.clone()));
        Ok(session)
    }

    /// Clear the current identity
    pub fn sign_out(&self) {
        if let Some(session) = self.state.send_replace(None) {
            tracing::info!(user_id = %session.user_id, "Signed out");
        }
    }

    /// The signed-in identity, if any
    pub fn current(&self) -> Option<UserSession> {
        self.state.borrow().clone()
    }

    /// Identity-change events, starting from the current identity
    pub fn watch(&self) -> watch::Receiver<Option<UserSession>> {
        self.state.subscribe()
    }
}
