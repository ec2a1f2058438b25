//! Rule domain entity and its request types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Lifecycle status of a rule
///
/// Transitions are decided by the server; the client only mirrors them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    Draft,
    UnderReview,
    Approved,
    Active,
    Inactive,
    Deprecated,
}

impl RuleStatus {
    pub const ALL: [RuleStatus; 6] = [
        RuleStatus::Draft,
        RuleStatus::UnderReview,
        RuleStatus::Approved,
        RuleStatus::Active,
        RuleStatus::Inactive,
        RuleStatus::Deprecated,
    ];

    /// Wire representation (e.g. `UNDER_REVIEW`)
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Draft => "DRAFT",
            RuleStatus::UnderReview => "UNDER_REVIEW",
            RuleStatus::Approved => "APPROVED",
            RuleStatus::Active => "ACTIVE",
            RuleStatus::Inactive => "INACTIVE",
            RuleStatus::Deprecated => "DEPRECATED",
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        RuleStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("Unknown rule status: {}", s))
    }
}

/// Evaluation priority of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| format!("Unknown priority: {}", s))
    }
}

/// Decode an explicit `null` the same as a missing key
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A named unit of business logic as returned by the rules service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Opaque server-assigned id
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Rule-language source, interpreted only by the evaluation service
    #[serde(default, deserialize_with = "null_as_default")]
    pub dsl_content: String,
    pub status: RuleStatus,
    pub priority: Priority,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    /// Server-assigned, never computed client-side
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_by: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

impl Rule {
    /// Copy of this rule with a different status
    pub fn with_status(&self, status: RuleStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Build the create request used to duplicate this rule client-side
    pub fn duplicate_request(&self, new_name: Option<&str>) -> CreateRuleRequest {
        let name = match new_name {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("{} (Copy)", self.name),
        };
        CreateRuleRequest {
            name,
            description: self.description.clone(),
            dsl_content: self.dsl_content.clone(),
            priority: self.priority,
            category: self.category.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Payload for `POST /rules`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub description: String,
    pub dsl_content: String,
    pub priority: Priority,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Payload for `PUT /rules/{id}`; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRuleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsl_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl UpdateRuleRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.dsl_content.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.tags.is_none()
    }
}

/// Sort direction for list requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Parameters for `GET /rules`
///
/// Every `None` (or empty string) is left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl RuleListParams {
    /// Query pairs in wire order, skipping absent and empty values
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                pairs.push((key, v));
            }
        };

        push("page", self.page.filter(|p| *p > 0).map(|p| p.to_string()));
        push("limit", self.limit.filter(|l| *l > 0).map(|l| l.to_string()));
        push("sort_by", self.sort_by.clone());
        push("sort_order", self.sort_order.map(|o| o.as_str().to_string()));
        push("status", self.status.clone());
        push("category", self.category.clone());
        push("search", self.search.clone());
        pairs
    }
}

/// Free-form metrics document returned by `GET /rules/{id}/metrics`
pub type RuleMetrics = Map<String, JsonValue>;

/// Payload for `POST /rules/validate`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateRuleRequest {
    pub dsl_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_category: Option<String>,
    #[serde(rename = "testData", skip_serializing_if = "Option::is_none")]
    pub test_data: Option<JsonValue>,
}

/// Outcome of a dry-run validation
///
/// Validation failures are reported here rather than as errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(alias = "valid", alias = "isValid")]
    pub is_valid: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// One entry of a rule's audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleHistoryEntry {
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default, alias = "changedBy")]
    pub changed_by: Option<String>,
    #[serde(default, alias = "changedAt")]
    pub changed_at: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// File format for `POST /rules/export`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(format!("Unsupported export format: {}", other)),
        }
    }
}

/// Response of `POST /rules/import`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub imported: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<JsonValue>,
}
