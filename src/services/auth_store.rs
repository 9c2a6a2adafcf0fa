use std::sync::{Arc, RwLock};

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::user::{TokenClaims, User};
use crate::services::storage::KeyValueStore;

pub const AUTH_STORAGE_KEY: &str = "auth-storage";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
}

/// Signed-in user and bearer token, mirrored to durable storage on every
/// change. Cloned into every consumer through the application state.
#[derive(Clone)]
pub struct AuthStore {
    state: Arc<RwLock<AuthState>>,
    storage: Arc<dyn KeyValueStore>,
}

impl AuthStore {
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let state = match storage.get(AUTH_STORAGE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring unreadable persisted auth state");
                AuthState::default()
            }),
            Ok(None) => AuthState::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted auth state");
                AuthState::default()
            }
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            storage,
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.read().expect("auth state lock poisoned").clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().expect("auth state lock poisoned").token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().expect("auth state lock poisoned").is_authenticated
    }

    /// Stores a freshly issued token together with the user it names.
    pub fn complete_login(&self, token: &str) -> Result<User> {
        let user = decode_token_user(token)?;
        self.update(|state| {
            state.user = Some(user.clone());
            state.token = Some(token.to_string());
            state.is_authenticated = true;
        });
        tracing::info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    pub fn logout(&self) {
        self.update(|state| *state = AuthState::default());
    }

    fn update(&self, f: impl FnOnce(&mut AuthState)) {
        let persisted = {
            let mut guard = self.state.write().expect("auth state lock poisoned");
            f(&mut guard);
            serde_json::to_string(&*guard)
        };
        let result = persisted
            .map_err(Error::from)
            .and_then(|raw| self.storage.set(AUTH_STORAGE_KEY, &raw));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist auth state");
        }
    }
}

/// Reads `sub`, `email` and `fullName` from a JWT without checking its
/// signature. The result is only used for display.
pub fn decode_token_user(token: &str) -> Result<User> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| User::from(data.claims))
        .map_err(|e| {
            tracing::error!(error = %e, "Error decoding token");
            Error::Unauthorized("Invalid token format".to_string())
        })
}
