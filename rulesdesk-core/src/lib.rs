//! Rulesdesk Core - client library for the rules management service
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Entities and pure functions (Rule, filters, derived views)
//! - **ports**: Trait definitions for external dependencies (RulesApi, AuthApi)
//! - **services**: Stateful stores (RuleStore, SessionStore, NotificationQueue)
//! - **adapters**: Concrete implementations (reqwest HTTP clients)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use adapters::{HttpAuthApi, HttpRulesApi, HttpTransport, TokenHandle};
use config::Config;
use services::{NotificationQueue, RuleStore, SessionStore};

// Re-export commonly used types at crate root
pub use domain::result::Result as ApiResult;
pub use domain::{
    ApiError, CreateRuleRequest, FiltersPatch, Notification, NotificationType, Priority, Rule,
    RuleFilters, RuleStatus, UpdateRuleRequest, User, UserRole,
};

/// Main context for rulesdesk operations
///
/// Composition root: owns the configuration, the shared token, the HTTP
/// clients and every store. Front ends receive this instead of reaching
/// for globals.
pub struct RulesdeskContext {
    pub config: Config,
    pub rulesdesk_dir: PathBuf,
    pub token: TokenHandle,
    pub notifications: Arc<NotificationQueue>,
    pub rules_api: Arc<HttpRulesApi>,
    pub auth_api: Arc<HttpAuthApi>,
    pub rule_store: RuleStore,
    pub session: SessionStore,
}

impl RulesdeskContext {
    /// Create a new context from the settings in `rulesdesk_dir`
    pub fn new(rulesdesk_dir: &Path) -> Result<Self> {
        let config = Config::load(rulesdesk_dir)?;
        Self::with_config(rulesdesk_dir, config)
    }

    pub fn with_config(rulesdesk_dir: &Path, config: Config) -> Result<Self> {
        let token = TokenHandle::new(config.token.clone());
        let notifications = Arc::new(NotificationQueue::new());

        let transport = Arc::new(
            HttpTransport::new(
                &config.api_base_url,
                &config.api_prefix,
                Duration::from_secs(config.timeout_secs),
                token.clone(),
            )?
            .with_notifications(notifications.clone()),
        );

        let rules_api = Arc::new(HttpRulesApi::new(Arc::clone(&transport)));
        let auth_api = Arc::new(HttpAuthApi::new(Arc::clone(&transport)));

        let rule_store =
            RuleStore::with_page_size(rules_api.clone(), notifications.clone(), config.page_size);
        let session = SessionStore::new(auth_api.clone(), token.clone());

        Ok(Self {
            config,
            rulesdesk_dir: rulesdesk_dir.to_path_buf(),
            token,
            notifications,
            rules_api,
            auth_api,
            rule_store,
            session,
        })
    }

    /// Write the current token back to settings.json
    ///
    /// Only `session.token` is written, so environment overrides in
    /// `config` never end up on disk.
    pub fn persist_session(&mut self) -> Result<()> {
        self.config.set_token(self.token.get());
        self.config.save_token(&self.rulesdesk_dir)
    }
}
