use crate::client::ApiClient;
use crate::session::USER_KEY;
use crate::types::ApiRequest;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    user: Option<UserProfile>,
}

/// Login, profile and logout.
pub struct ProfileService {
    client: ApiClient,
}

impl ProfileService {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// `POST /auth/login`; stores the returned token and, when present, the profile.
    pub async fn login(&self, credentials: &Credentials) -> Result<Option<UserProfile>> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(Error::validation_with_context(
                "email and password are required",
                ErrorContext::new().with_source("profile_service"),
            ));
        }
        let request = ApiRequest::post("/auth/login")
            .json(serde_json::to_value(credentials)?)
            .no_retry();
        let login: LoginResponse = ApiClient::decode(&self.client.send(request).await?)?;

        let store = self.client.store();
        store.set_token(&login.token)?;
        if let Some(user) = &login.user {
            store.set(USER_KEY, &serde_json::to_string(user)?)?;
        }
        info!(store = store.name(), "logged in");
        Ok(login.user)
    }

    /// `GET /users/me`, always from the network; the result is kept under `user`.
    pub async fn me(&self) -> Result<UserProfile> {
        let response = self
            .client
            .send(ApiRequest::get("/users/me").no_cache())
            .await?;
        let profile: UserProfile = ApiClient::decode(&response)?;
        self.client
            .store()
            .set(USER_KEY, &serde_json::to_string(&profile)?)?;
        Ok(profile)
    }

    /// Profile stored by the last `login` or `me`, if it still decodes.
    pub fn cached_profile(&self) -> Option<UserProfile> {
        let raw = self.client.store().get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "discarding unreadable cached profile");
                None
            }
        }
    }

    /// Forget the token, the stored profile and every cached response.
    pub async fn logout(&self) -> Result<()> {
        self.client.store().clear_session()?;
        self.client.clear_cache().await?;
        info!("logged out");
        Ok(())
    }
}
