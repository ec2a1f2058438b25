//! Rules management API client
//!
//! Implements [`RulesApi`] over the shared [`HttpTransport`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::{json, Value as JsonValue};
use url::Url;

use super::http::HttpTransport;
use crate::domain::result::Result;
use crate::domain::{
    ApiResponse, CreateRuleRequest, ExportFormat, ImportResult, Rule, RuleHistoryEntry,
    RuleListParams, RuleMetrics, UpdateRuleRequest, ValidateRuleRequest, ValidationResult,
};
use crate::ports::RulesApi;

/// HTTP implementation of the rules port
pub struct HttpRulesApi {
    transport: Arc<HttpTransport>,
}

impl HttpRulesApi {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// `rules/{id}` or `rules/{id}/{action}`, with the id escaped
    fn rule_url(&self, id: &str, action: Option<&str>) -> Result<Url> {
        match action {
            Some(action) => self.transport.segments_url(&["rules", id, action]),
            None => self.transport.segments_url(&["rules", id]),
        }
    }

    /// `POST /rules/{id}/{action}` for the status transitions
    async fn transition(&self, id: &str, action: &str) -> Result<Option<Rule>> {
        let url = self.rule_url(id, Some(action))?;
        let envelope: ApiResponse<Rule> = self
            .transport
            .send(self.transport.request(Method::POST, url))
            .await?;
        Ok(envelope.data)
    }

    async fn bulk(&self, action: &str, ids: &[String]) -> Result<ApiResponse<Vec<Rule>>> {
        let url = self.transport.url(&format!("rules/bulk/{}", action), &[])?;
        let builder = self
            .transport
            .request(Method::POST, url)
            .json(&json!({ "ruleIds": ids }));
        self.transport.send(builder).await
    }
}

#[async_trait]
impl RulesApi for HttpRulesApi {
    async fn list_rules(&self, params: &RuleListParams) -> Result<ApiResponse<Vec<Rule>>> {
        let url = self.transport.url("rules", &params.query_pairs())?;
        self.transport
            .send(self.transport.request(Method::GET, url))
            .await
    }

    async fn get_rule(&self, id: &str) -> Result<Rule> {
        let url = self.rule_url(id, None)?;
        self.transport
            .send_data(self.transport.request(Method::GET, url))
            .await
    }

    async fn create_rule(&self, request: &CreateRuleRequest) -> Result<Rule> {
        let url = self.transport.url("rules", &[])?;
        self.transport
            .send_data(self.transport.request(Method::POST, url).json(request))
            .await
    }

    async fn update_rule(&self, id: &str, request: &UpdateRuleRequest) -> Result<Rule> {
        let url = self.rule_url(id, None)?;
        self.transport
            .send_data(self.transport.request(Method::PUT, url).json(request))
            .await
    }

    async fn delete_rule(&self, id: &str) -> Result<()> {
        let url = self.rule_url(id, None)?;
        self.transport
            .send_empty(self.transport.request(Method::DELETE, url))
            .await
    }

    async fn submit_for_approval(&self, id: &str) -> Result<Option<Rule>> {
        self.transition(id, "submit-approval").await
    }

    async fn approve_rule(&self, id: &str) -> Result<Option<Rule>> {
        self.transition(id, "approve").await
    }

    async fn activate_rule(&self, id: &str) -> Result<Option<Rule>> {
        self.transition(id, "activate").await
    }

    async fn deactivate_rule(&self, id: &str) -> Result<Option<Rule>> {
        self.transition(id, "deactivate").await
    }

    async fn get_rule_metrics(&self, id: &str) -> Result<RuleMetrics> {
        let url = self.rule_url(id, Some("metrics"))?;
        self.transport
            .send_data(self.transport.request(Method::GET, url))
            .await
    }

    async fn get_rule_history(&self, id: &str) -> Result<Vec<RuleHistoryEntry>> {
        let url = self.rule_url(id, Some("history"))?;
        self.transport
            .send_data(self.transport.request(Method::GET, url))
            .await
    }

    async fn validate_rule(&self, request: &ValidateRuleRequest) -> Result<ValidationResult> {
        let url = self.transport.url("rules/validate", &[])?;
        self.transport
            .send_data(self.transport.request(Method::POST, url).json(request))
            .await
    }

    async fn test_rule(&self, id: &str, test_data: &JsonValue) -> Result<JsonValue> {
        let url = self.rule_url(id, Some("test"))?;
        let builder = self
            .transport
            .request(Method::POST, url)
            .json(&json!({ "testData": test_data }));
        self.transport.send_data(builder).await
    }

    async fn duplicate_rule(&self, id: &str, new_name: Option<&str>) -> Result<Rule> {
        let url = self.rule_url(id, Some("duplicate"))?;
        let builder = self
            .transport
            .request(Method::POST, url)
            .json(&json!({ "newName": new_name }));
        self.transport.send_data(builder).await
    }

    async fn bulk_activate(&self, ids: &[String]) -> Result<Vec<Rule>> {
        Ok(self.bulk("activate", ids).await?.data.unwrap_or_default())
    }

    async fn bulk_deactivate(&self, ids: &[String]) -> Result<Vec<Rule>> {
        Ok(self.bulk("deactivate", ids).await?.data.unwrap_or_default())
    }

    async fn bulk_delete(&self, ids: &[String]) -> Result<()> {
        let url = self.transport.url("rules/bulk/delete", &[])?;
        let builder = self
            .transport
            .request(Method::POST, url)
            .json(&json!({ "ruleIds": ids }));
        self.transport.send_empty(builder).await
    }

    async fn export_rules(&self, format: ExportFormat, filters: Option<&JsonValue>) -> Result<Vec<u8>> {
        let url = self.transport.url("rules/export", &[])?;
        let builder = self
            .transport
            .request(Method::POST, url)
            .json(&json!({ "format": format, "filters": filters }));
        self.transport.send_bytes(builder).await
    }

    async fn import_rules(&self, file_name: &str, contents: Vec<u8>) -> Result<ImportResult> {
        let url = self.transport.url("rules/import", &[])?;
        let part = Part::bytes(contents).file_name(file_name.to_string());
        let form = Form::new().part("file", part);
        self.transport
            .send_data(self.transport.request(Method::POST, url).multipart(form))
            .await
    }
}
