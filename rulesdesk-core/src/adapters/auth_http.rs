//! Auth API client

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use super::http::HttpTransport;
use crate::domain::result::Result;
use crate::domain::{ChangePasswordRequest, LoginRequest, LoginResponse, UpdateUserRequest, User};
use crate::ports::AuthApi;

pub struct HttpAuthApi {
    transport: Arc<HttpTransport>,
}

impl HttpAuthApi {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let url = self.transport.url("auth/login", &[])?;
        self.transport
            .send_data(self.transport.request(Method::POST, url).json(request))
            .await
    }

    async fn logout(&self) -> Result<()> {
        let url = self.transport.url("auth/logout", &[])?;
        self.transport
            .send_empty(self.transport.request(Method::POST, url))
            .await
    }

    async fn current_user(&self) -> Result<User> {
        let url = self.transport.url("auth/me", &[])?;
        self.transport
            .send_data(self.transport.request(Method::GET, url))
            .await
    }

    async fn update_profile(&self, user_id: &str, request: &UpdateUserRequest) -> Result<User> {
        let url = self.transport.segments_url(&["auth", "users", user_id])?;
        self.transport
            .send_data(self.transport.request(Method::PUT, url).json(request))
            .await
    }

    async fn change_password(&self, user_id: &str, request: &ChangePasswordRequest) -> Result<()> {
        let url = self
            .transport
            .segments_url(&["auth", "users", user_id, "change-password"])?;
        self.transport
            .send_empty(self.transport.request(Method::POST, url).json(request))
            .await
    }

    async fn refresh_token(&self) -> Result<LoginResponse> {
        let url = self.transport.url("auth/refresh", &[])?;
        self.transport
            .send_data(self.transport.request(Method::POST, url))
            .await
    }

    async fn verify_email(&self, token: &str) -> Result<()> {
        let url = self.transport.url("auth/verify-email", &[])?;
        self.transport
            .send_empty(self.transport.request(Method::POST, url).json(&json!({ "token": token })))
            .await
    }

    async fn request_password_reset(&self, email: &str) -> Result<()> {
        let url = self.transport.url("auth/forgot-password", &[])?;
        self.transport
            .send_empty(self.transport.request(Method::POST, url).json(&json!({ "email": email })))
            .await
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let url = self.transport.url("auth/reset-password", &[])?;
        let body = json!({ "token": token, "newPassword": new_password });
        self.transport
            .send_empty(self.transport.request(Method::POST, url).json(&body))
            .await
    }
}
