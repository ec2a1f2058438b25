//! Rules API port - the entity client the rule store talks to

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::result::Result;
use crate::domain::{
    ApiResponse, CreateRuleRequest, ExportFormat, ImportResult, Rule, RuleHistoryEntry,
    RuleListParams, RuleMetrics, UpdateRuleRequest, ValidateRuleRequest, ValidationResult,
};

/// Rules management API abstraction
///
/// One method per REST interaction. Implementations return the decoded
/// body on success and a single normalized [`crate::ApiError`] on failure.
#[async_trait]
pub trait RulesApi: Send + Sync {
    // === CRUD ===

    /// List one page of rules; the envelope carries pagination
    async fn list_rules(&self, params: &RuleListParams) -> Result<ApiResponse<Vec<Rule>>>;

    /// Fetch a single rule
    async fn get_rule(&self, id: &str) -> Result<Rule>;

    /// Create a rule; the server response is authoritative
    async fn create_rule(&self, request: &CreateRuleRequest) -> Result<Rule>;

    /// Update a rule
    async fn update_rule(&self, id: &str, request: &UpdateRuleRequest) -> Result<Rule>;

    /// Delete a rule
    async fn delete_rule(&self, id: &str) -> Result<()>;

    // === Status transitions ===

    async fn submit_for_approval(&self, id: &str) -> Result<Option<Rule>>;

    async fn approve_rule(&self, id: &str) -> Result<Option<Rule>>;

    async fn activate_rule(&self, id: &str) -> Result<Option<Rule>>;

    async fn deactivate_rule(&self, id: &str) -> Result<Option<Rule>>;

    // === Secondary resources ===

    async fn get_rule_metrics(&self, id: &str) -> Result<RuleMetrics>;

    async fn get_rule_history(&self, id: &str) -> Result<Vec<RuleHistoryEntry>>;

    /// Dry-run validation of rule source
    async fn validate_rule(&self, request: &ValidateRuleRequest) -> Result<ValidationResult>;

    /// Execute a rule against sample input
    async fn test_rule(&self, id: &str, test_data: &JsonValue) -> Result<JsonValue>;

    /// Server-assisted copy
    async fn duplicate_rule(&self, id: &str, new_name: Option<&str>) -> Result<Rule>;

    // === Batch endpoints ===

    async fn bulk_activate(&self, ids: &[String]) -> Result<Vec<Rule>>;

    async fn bulk_deactivate(&self, ids: &[String]) -> Result<Vec<Rule>>;

    async fn bulk_delete(&self, ids: &[String]) -> Result<()>;

    // === Import / export ===

    /// Export rules as a file; returns the raw bytes
    async fn export_rules(&self, format: ExportFormat, filters: Option<&JsonValue>) -> Result<Vec<u8>>;

    /// Upload a rules file
    async fn import_rules(&self, file_name: &str, contents: Vec<u8>) -> Result<ImportResult>;
}
