//! Filter criteria and derived views over the in-memory rule collection
//!
//! Everything here is a pure function of (collection, filters, search).
//! Views are recomputed from scratch on every call.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rule::{Priority, Rule, RuleListParams, RuleStatus};

/// Inclusive range over `created_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// Active filter criteria
///
/// AND across fields, OR within `status`, `priority` and `tags`.
/// An empty field matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFilters {
    pub status: Vec<RuleStatus>,
    pub priority: Vec<Priority>,
    pub category: String,
    pub created_by: String,
    pub date_range: Option<DateRange>,
    pub tags: Vec<String>,
}

/// Partial update of [`RuleFilters`]; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiltersPatch {
    pub status: Option<Vec<RuleStatus>>,
    pub priority: Option<Vec<Priority>>,
    pub category: Option<String>,
    pub created_by: Option<String>,
    /// `Some(None)` clears the range
    pub date_range: Option<Option<DateRange>>,
    pub tags: Option<Vec<String>>,
}

impl RuleFilters {
    /// Merge a patch into these filters
    pub fn apply(&mut self, patch: FiltersPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(created_by) = patch.created_by {
            self.created_by = created_by;
        }
        if let Some(date_range) = patch.date_range {
            self.date_range = date_range;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
            && self.priority.is_empty()
            && self.category.is_empty()
            && self.created_by.is_empty()
            && self.date_range.is_none()
            && self.tags.is_empty()
    }

    /// Write the server-side subset of these criteria into list params
    ///
    /// The list endpoint only understands status, category and search;
    /// the remaining criteria are applied client-side to the fetched page.
    pub fn write_query(&self, search: &str, params: &mut RuleListParams) {
        if !self.status.is_empty() {
            let joined: Vec<&str> = self.status.iter().map(|s| s.as_str()).collect();
            params.status = Some(joined.join(","));
        }
        if !self.category.is_empty() {
            params.category = Some(self.category.clone());
        }
        if !search.is_empty() {
            params.search = Some(search.to_string());
        }
    }
}

/// Parse a server timestamp; `None` when it is not a recognizable date
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn matches_search(rule: &Rule, query: &str) -> bool {
    rule.name.to_lowercase().contains(query)
        || rule.description.to_lowercase().contains(query)
        || rule.tags.iter().any(|tag| tag.to_lowercase().contains(query))
}

/// Apply search and filters to a collection, preserving relative order
///
/// Evaluation order: search, status, priority, category, createdBy,
/// date range, tags.
pub fn filter_rules(rules: &[Rule], filters: &RuleFilters, search: &str) -> Vec<Rule> {
    let query = search.to_lowercase();
    let created_by = filters.created_by.to_lowercase();

    rules
        .iter()
        .filter(|rule| query.is_empty() || matches_search(rule, &query))
        .filter(|rule| filters.status.is_empty() || filters.status.contains(&rule.status))
        .filter(|rule| filters.priority.is_empty() || filters.priority.contains(&rule.priority))
        .filter(|rule| filters.category.is_empty() || rule.category == filters.category)
        .filter(|rule| {
            created_by.is_empty() || rule.created_by.to_lowercase().contains(&created_by)
        })
        .filter(|rule| match &filters.date_range {
            None => true,
            // Rows with an unreadable timestamp never fall inside a range
            Some(range) => parse_timestamp(&rule.created_at)
                .map(|created| range.contains(created))
                .unwrap_or(false),
        })
        .filter(|rule| {
            filters.tags.is_empty() || rule.tags.iter().any(|tag| filters.tags.contains(tag))
        })
        .cloned()
        .collect()
}

/// Per-status counts over the in-memory collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesStats {
    /// Whole collection, not just the four buckets below
    pub total: usize,
    pub active: usize,
    pub draft: usize,
    pub under_review: usize,
    pub deprecated: usize,
}

pub fn rules_stats(rules: &[Rule]) -> RulesStats {
    let mut stats = RulesStats {
        total: rules.len(),
        ..Default::default()
    };
    for rule in rules {
        match rule.status {
            RuleStatus::Active => stats.active += 1,
            RuleStatus::Draft => stats.draft += 1,
            RuleStatus::UnderReview => stats.under_review += 1,
            RuleStatus::Deprecated => stats.deprecated += 1,
            RuleStatus::Approved | RuleStatus::Inactive => {}
        }
    }
    stats
}

pub fn rules_by_status(rules: &[Rule], status: RuleStatus) -> Vec<Rule> {
    rules.iter().filter(|r| r.status == status).cloned().collect()
}

pub fn rules_by_priority(rules: &[Rule], priority: Priority) -> Vec<Rule> {
    rules.iter().filter(|r| r.priority == priority).cloned().collect()
}
