//! Session store - current user and bearer token
//!
//! The token lives in a [`TokenHandle`] shared with the HTTP transport, so a
//! 401 seen by any client ends the session here as well.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::adapters::TokenHandle;
use crate::domain::result::Result;
use crate::domain::{
    ApiError, ChangePasswordRequest, LoginRequest, LoginResponse, UpdateUserRequest, User,
    UserRole,
};
use crate::ports::AuthApi;

/// Error returned by profile actions without a logged-in user
pub const NO_USER_MESSAGE: &str = "No user logged in";

#[derive(Debug, Default)]
struct SessionState {
    user: Option<User>,
    loading: bool,
    error: Option<String>,
}

/// Session store
pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    token: TokenHandle,
    state: Mutex<SessionState>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn AuthApi>, token: TokenHandle) -> Self {
        Self {
            api,
            token,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn begin(&self) {
        let mut s = self.state.lock();
        s.loading = true;
        s.error = None;
    }

    /// Lower the loading flag and record the outcome
    fn finish<T>(&self, result: Result<T>) -> Result<T> {
        let mut s = self.state.lock();
        s.loading = false;
        if let Err(e) = &result {
            s.error = Some(e.to_string());
        }
        result
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        self.begin();
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.api.login(&request).await;
        if let Ok(response) = &result {
            self.token.set(response.token.clone());
            self.state.lock().user = Some(response.user.clone());
            info!(user = %response.user.email, "Logged in");
        }
        self.finish(result)
    }

    /// End the session; server failures are logged and local state is
    /// cleared regardless
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Logout request failed");
        }
        self.clear();
    }

    /// Restore the user for an existing token
    ///
    /// An invalid token ends the session.
    pub async fn initialize(&self) {
        if !self.token.is_set() {
            return;
        }
        match self.api.current_user().await {
            Ok(user) => {
                self.state.lock().user = Some(user);
            }
            Err(e) => {
                warn!(error = %e, "Failed to restore session");
                self.logout().await;
            }
        }
    }

    fn require_user(&self) -> Result<User> {
        self.state
            .lock()
            .user
            .clone()
            .ok_or_else(|| ApiError::precondition(NO_USER_MESSAGE))
    }

    pub async fn update_profile(&self, request: &UpdateUserRequest) -> Result<User> {
        let user = self.require_user()?;
        self.begin();
        let result = self.api.update_profile(&user.id, request).await;
        if let Ok(updated) = &result {
            self.state.lock().user = Some(updated.clone());
        }
        self.finish(result)
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<()> {
        let user = self.require_user()?;
        self.begin();
        let request = ChangePasswordRequest {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        let result = self.api.change_password(&user.id, &request).await;
        self.finish(result)
    }

    /// Drop the token and user without contacting the server
    pub fn clear(&self) {
        self.token.clear();
        let mut s = self.state.lock();
        s.user = None;
        s.error = None;
    }

    pub fn clear_error(&self) {
        self.state.lock().error = None;
    }

    // ---- Snapshots ----

    pub fn user(&self) -> Option<User> {
        self.state.lock().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.token.get()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    // ---- Predicates ----

    pub fn is_authenticated(&self) -> bool {
        self.token.is_set() && self.state.lock().user.is_some()
    }

    /// Role of the current user, VIEWER when nobody is logged in
    pub fn role(&self) -> UserRole {
        self.state
            .lock()
            .user
            .as_ref()
            .map(|u| u.role)
            .unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == UserRole::Admin
    }

    pub fn is_manager(&self) -> bool {
        matches!(self.role(), UserRole::Admin | UserRole::Manager)
    }

    pub fn can_edit(&self) -> bool {
        matches!(
            self.role(),
            UserRole::Admin | UserRole::Manager | UserRole::User
        )
    }
}
