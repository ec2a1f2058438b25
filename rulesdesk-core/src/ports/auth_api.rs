//! Auth API port - session lifecycle endpoints

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{ChangePasswordRequest, LoginRequest, LoginResponse, UpdateUserRequest, User};

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;

    /// Invalidate the session server-side
    async fn logout(&self) -> Result<()>;

    async fn current_user(&self) -> Result<User>;

    async fn update_profile(&self, user_id: &str, request: &UpdateUserRequest) -> Result<User>;

    async fn change_password(&self, user_id: &str, request: &ChangePasswordRequest) -> Result<()>;

    async fn refresh_token(&self) -> Result<LoginResponse>;

    async fn verify_email(&self, token: &str) -> Result<()>;

    async fn request_password_reset(&self, email: &str) -> Result<()>;

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<()>;
}
