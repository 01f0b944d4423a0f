use crate::domain::ports::Storage;
use crate::utils::error::{DeskError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_DATA_KEY: &str = "userData";
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Signed-in user's session kept in the key/value store.
pub struct SessionStore<S: Storage> {
    storage: S,
}

impl<S: Storage> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.storage.read_key(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_vec(value)?;
        self.storage.write_key(key, &data).await
    }

    pub async fn token(&self) -> Result<Option<String>> {
        self.read_json(AUTH_TOKEN_KEY).await
    }

    pub async fn login(&self, token: &str, user: &Value) -> Result<()> {
        if token.trim().is_empty() {
            return Err(DeskError::MissingConfigError {
                field: "token".to_string(),
            });
        }
        self.write_json(AUTH_TOKEN_KEY, &token).await?;
        self.write_json(USER_DATA_KEY, user).await?;
        tracing::info!("Session stored");
        Ok(())
    }

    pub async fn user(&self) -> Result<Option<Value>> {
        self.read_json(USER_DATA_KEY).await
    }

    /// Clears token and user data; the theme survives logout.
    pub async fn logout(&self) -> Result<()> {
        self.storage.remove_key(AUTH_TOKEN_KEY).await?;
        self.storage.remove_key(USER_DATA_KEY).await?;
        tracing::info!("Session cleared");
        Ok(())
    }

    /// Logs out when the backend rejected the token. Returns whether it did.
    pub async fn handle_error(&self, error: &DeskError) -> Result<bool> {
        if !error.is_auth_error() {
            return Ok(false);
        }
        tracing::warn!("Backend rejected credentials, logging out: {}", error);
        self.logout().await?;
        Ok(true)
    }

    pub async fn theme(&self) -> Result<Theme> {
        Ok(self.read_json(THEME_KEY).await?.unwrap_or_default())
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.write_json(THEME_KEY, &theme).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::LocalStorage;
    use serde_json::json;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> SessionStore<LocalStorage> {
        SessionStore::new(LocalStorage::new(dir.path().to_str().unwrap().to_string()))
    }

    #[tokio::test]
    async fn test_login_logout_keeps_theme() {
        let dir = TempDir::new().unwrap();
        let session = store(&dir);

        session.login("tok", &json!({"id": 3, "role": "recruiter"})).await.unwrap();
        session.set_theme(Theme::Dark).await.unwrap();
        assert_eq!(session.token().await.unwrap().as_deref(), Some("tok"));
        assert_eq!(session.user().await.unwrap().unwrap()["role"], "recruiter");

        session.logout().await.unwrap();
        assert!(session.token().await.unwrap().is_none());
        assert!(session.user().await.unwrap().is_none());
        assert_eq!(session.theme().await.unwrap(), Theme::Dark);
    }

    #[tokio::test]
    async fn test_auth_errors_log_out() {
        let dir = TempDir::new().unwrap();
        let session = store(&dir);
        session.login("tok", &json!({})).await.unwrap();

        let not_auth = DeskError::NotFoundError {
            kind: "Job".to_string(),
            id: "1".to_string(),
        };
        assert!(!session.handle_error(&not_auth).await.unwrap());
        assert!(session.token().await.unwrap().is_some());

        let auth = DeskError::AuthError {
            status: 401,
            url: "http://localhost/api/jobs/".to_string(),
        };
        assert!(session.handle_error(&auth).await.unwrap());
        assert!(session.token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_token_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).login(" ", &json!({})).await.is_err());
    }
}
