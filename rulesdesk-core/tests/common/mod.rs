//! In-memory fakes of the rules and auth ports
//!
//! Each fake records the calls it receives and can be scripted to fail.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};
use tokio::sync::Notify;

use rulesdesk_core::domain::result::Result;
use rulesdesk_core::domain::{
    ApiError, ApiResponse, ChangePasswordRequest, CreateRuleRequest, ExportFormat, ImportResult,
    LoginRequest, LoginResponse, PaginationInfo, Priority, Rule, RuleHistoryEntry,
    RuleListParams, RuleMetrics, RuleStatus, UpdateRuleRequest, UpdateUserRequest, User,
    UserRole, ValidateRuleRequest, ValidationResult,
};
use rulesdesk_core::ports::{AuthApi, RulesApi};

pub fn rule(id: &str, name: &str, status: RuleStatus) -> Rule {
    Rule {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("Description of {}", name),
        dsl_content: "IF quantity >= 3 THEN discount = price * 0.1".to_string(),
        status,
        priority: Priority::Medium,
        category: "PROMOTIONS".to_string(),
        version: 1,
        created_by: "alice".to_string(),
        created_at: "2024-03-01T10:00:00Z".to_string(),
        updated_at: "2024-03-01T10:00:00Z".to_string(),
        tags: vec!["seasonal".to_string()],
    }
}

pub fn user(role: UserRole) -> User {
    User {
        id: "u1".to_string(),
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        role,
        avatar: None,
        last_login: None,
    }
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Scriptable fake of the rules API
#[derive(Default)]
pub struct FakeRulesApi {
    /// Rules the "server" knows about
    pub server_rules: Mutex<Vec<Rule>>,
    pub pagination: Mutex<Option<PaginationInfo>>,
    /// Error returned by every list call
    pub list_error: Mutex<Option<ApiError>>,
    /// Ids whose per-rule calls fail with a 500
    pub failing_ids: Mutex<HashSet<String>>,
    pub metrics_error: Mutex<Option<ApiError>>,
    pub validation_error: Mutex<Option<ApiError>>,
    /// When set, get_rule waits for a notification before answering
    pub get_gate: Mutex<Option<Arc<Notify>>>,
    pub list_params: Mutex<Vec<RuleListParams>>,
    pub calls: Mutex<Vec<String>>,
    pub network_calls: AtomicUsize,
    created: AtomicUsize,
}

impl FakeRulesApi {
    pub fn with_rules(rules: Vec<Rule>) -> Arc<Self> {
        let api = Self::default();
        *api.server_rules.lock() = rules;
        Arc::new(api)
    }

    pub fn fail_for(&self, id: &str) {
        self.failing_ids.lock().insert(id.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn last_list_params(&self) -> Option<RuleListParams> {
        self.list_params.lock().last().cloned()
    }

    fn record(&self, call: String) {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(call);
    }

    fn check(&self, id: &str) -> Result<()> {
        if self.failing_ids.lock().contains(id) {
            return Err(ApiError::http(500, Some(format!("Rule {} could not be processed", id))));
        }
        Ok(())
    }

    fn find(&self, id: &str) -> Result<Rule> {
        self.server_rules
            .lock()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| ApiError::http(404, Some("Rule not found".to_string())))
    }

    fn set_status(&self, id: &str, status: RuleStatus) -> Result<Option<Rule>> {
        self.check(id)?;
        let mut rules = self.server_rules.lock();
        Ok(rules.iter_mut().find(|r| r.id == id).map(|r| {
            r.status = status;
            r.clone()
        }))
    }
}

#[async_trait]
impl RulesApi for FakeRulesApi {
    async fn list_rules(&self, params: &RuleListParams) -> Result<ApiResponse<Vec<Rule>>> {
        self.record("list".to_string());
        self.list_params.lock().push(params.clone());
        if let Some(err) = self.list_error.lock().clone() {
            return Err(err);
        }
        let mut response = ApiResponse::ok(self.server_rules.lock().clone());
        if let Some(pagination) = *self.pagination.lock() {
            response = response.with_pagination(pagination);
        }
        Ok(response)
    }

    async fn get_rule(&self, id: &str) -> Result<Rule> {
        self.record(format!("get:{}", id));
        let gate = self.get_gate.lock().clone();
        // Snapshot before waiting so the answer reflects request time
        let result = self.check(id).and_then(|_| self.find(id));
        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }

    async fn create_rule(&self, request: &CreateRuleRequest) -> Result<Rule> {
        self.record("create".to_string());
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let rule = Rule {
            id: format!("srv-{}", n),
            name: request.name.clone(),
            description: request.description.clone(),
            dsl_content: request.dsl_content.clone(),
            status: RuleStatus::Draft,
            priority: request.priority,
            category: request.category.clone(),
            version: 1,
            created_by: "server".to_string(),
            created_at: "2024-04-01T00:00:00Z".to_string(),
            updated_at: "2024-04-01T00:00:00Z".to_string(),
            tags: request.tags.clone(),
        };
        self.server_rules.lock().insert(0, rule.clone());
        Ok(rule)
    }

    async fn update_rule(&self, id: &str, request: &UpdateRuleRequest) -> Result<Rule> {
        self.record(format!("update:{}", id));
        self.check(id)?;
        let mut rules = self.server_rules.lock();
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::http(404, Some("Rule not found".to_string())))?;
        if let Some(name) = &request.name {
            rule.name = name.clone();
        }
        if let Some(priority) = request.priority {
            rule.priority = priority;
        }
        rule.version += 1;
        Ok(rule.clone())
    }

    async fn delete_rule(&self, id: &str) -> Result<()> {
        self.record(format!("delete:{}", id));
        self.check(id)?;
        self.server_rules.lock().retain(|r| r.id != id);
        Ok(())
    }

    async fn submit_for_approval(&self, id: &str) -> Result<Option<Rule>> {
        self.record(format!("submit:{}", id));
        self.set_status(id, RuleStatus::UnderReview)
    }

    async fn approve_rule(&self, id: &str) -> Result<Option<Rule>> {
        self.record(format!("approve:{}", id));
        self.set_status(id, RuleStatus::Approved)
    }

    async fn activate_rule(&self, id: &str) -> Result<Option<Rule>> {
        self.record(format!("activate:{}", id));
        self.set_status(id, RuleStatus::Active)
    }

    async fn deactivate_rule(&self, id: &str) -> Result<Option<Rule>> {
        self.record(format!("deactivate:{}", id));
        self.set_status(id, RuleStatus::Inactive)
    }

    async fn get_rule_metrics(&self, id: &str) -> Result<RuleMetrics> {
        self.record(format!("metrics:{}", id));
        if let Some(err) = self.metrics_error.lock().clone() {
            return Err(err);
        }
        let mut metrics = RuleMetrics::new();
        metrics.insert("evaluations".to_string(), json!(42));
        Ok(metrics)
    }

    async fn get_rule_history(&self, id: &str) -> Result<Vec<RuleHistoryEntry>> {
        self.record(format!("history:{}", id));
        Ok(Vec::new())
    }

    async fn validate_rule(&self, request: &ValidateRuleRequest) -> Result<ValidationResult> {
        self.record("validate".to_string());
        if let Some(err) = self.validation_error.lock().clone() {
            return Err(err);
        }
        Ok(ValidationResult {
            is_valid: request.dsl_content.starts_with("IF"),
            ..Default::default()
        })
    }

    async fn test_rule(&self, id: &str, test_data: &JsonValue) -> Result<JsonValue> {
        self.record(format!("test:{}", id));
        Ok(json!({ "input": test_data, "matched": true }))
    }

    async fn duplicate_rule(&self, id: &str, _new_name: Option<&str>) -> Result<Rule> {
        self.record(format!("server-duplicate:{}", id));
        self.find(id)
    }

    async fn bulk_activate(&self, ids: &[String]) -> Result<Vec<Rule>> {
        self.record("bulk-activate".to_string());
        Ok(ids
            .iter()
            .filter_map(|id| self.set_status(id, RuleStatus::Active).ok().flatten())
            .collect())
    }

    async fn bulk_deactivate(&self, ids: &[String]) -> Result<Vec<Rule>> {
        self.record("bulk-deactivate".to_string());
        Ok(ids
            .iter()
            .filter_map(|id| self.set_status(id, RuleStatus::Inactive).ok().flatten())
            .collect())
    }

    async fn bulk_delete(&self, ids: &[String]) -> Result<()> {
        self.record("bulk-delete".to_string());
        self.server_rules.lock().retain(|r| !ids.contains(&r.id));
        Ok(())
    }

    async fn export_rules(&self, _format: ExportFormat, _filters: Option<&JsonValue>) -> Result<Vec<u8>> {
        self.record("export".to_string());
        Ok(Vec::new())
    }

    async fn import_rules(&self, _file_name: &str, _contents: Vec<u8>) -> Result<ImportResult> {
        self.record("import".to_string());
        Ok(ImportResult::default())
    }
}

/// Scriptable fake of the auth API
pub struct FakeAuthApi {
    pub role: UserRole,
    pub login_error: Mutex<Option<ApiError>>,
    pub logout_error: Mutex<Option<ApiError>>,
    pub me_error: Mutex<Option<ApiError>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeAuthApi {
    pub fn new(role: UserRole) -> Arc<Self> {
        Arc::new(Self {
            role,
            login_error: Mutex::new(None),
            logout_error: Mutex::new(None),
            me_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.calls.lock().push(format!("login:{}", request.email));
        if let Some(err) = self.login_error.lock().clone() {
            return Err(err);
        }
        Ok(LoginResponse {
            token: "jwt-token".to_string(),
            user: user(self.role),
            expires_at: None,
        })
    }

    async fn logout(&self) -> Result<()> {
        self.calls.lock().push("logout".to_string());
        match self.logout_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn current_user(&self) -> Result<User> {
        self.calls.lock().push("me".to_string());
        match self.me_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(user(self.role)),
        }
    }

    async fn update_profile(&self, user_id: &str, request: &UpdateUserRequest) -> Result<User> {
        self.calls.lock().push(format!("update-profile:{}", user_id));
        let mut updated = user(self.role);
        if let Some(name) = &request.name {
            updated.name = name.clone();
        }
        Ok(updated)
    }

    async fn change_password(&self, user_id: &str, request: &ChangePasswordRequest) -> Result<()> {
        self.calls.lock().push(format!("change-password:{}", user_id));
        if request.current_password == request.new_password {
            return Err(ApiError::http(
                422,
                Some("New password must differ from the current one".to_string()),
            ));
        }
        Ok(())
    }

    async fn refresh_token(&self) -> Result<LoginResponse> {
        self.calls.lock().push("refresh".to_string());
        Ok(LoginResponse {
            token: "refreshed".to_string(),
            user: user(self.role),
            expires_at: None,
        })
    }

    async fn verify_email(&self, _token: &str) -> Result<()> {
        Ok(())
    }

    async fn request_password_reset(&self, _email: &str) -> Result<()> {
        Ok(())
    }

    async fn reset_password(&self, _token: &str, _new_password: &str) -> Result<()> {
        Ok(())
    }
}
