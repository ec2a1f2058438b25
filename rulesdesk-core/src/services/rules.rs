//! Rule store - in-memory rule collection with derived views
//!
//! Every action sets a busy flag, clears the last error, calls the
//! [`RulesApi`], then either patches local state or records the error and
//! forwards it to the notification sink before returning it. The busy flag
//! is cleared by a guard, so it also resets when an action's future is
//! dropped mid-flight.
//!
//! State is only locked between awaits, never across them. Two actions
//! can therefore interleave at their network calls: a fetch that started
//! before a delete may still set the deleted rule as current rule when it
//! completes. Responses are applied in arrival order, not request order.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::filter::{filter_rules, rules_by_priority, rules_by_status, rules_stats};
use crate::domain::result::Result;
use crate::domain::{
    ApiError, CreateRuleRequest, FiltersPatch, PaginationInfo, Priority, Rule, RuleFilters,
    RuleListParams, RuleMetrics, RuleStatus, RulesStats, SortOrder, UpdateRuleRequest,
    ValidateRuleRequest, ValidationResult,
};
use crate::ports::{NotificationSink, RulesApi};

/// Default page size for list requests
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default sort column for list requests
const DEFAULT_SORT_BY: &str = "created_at";

#[derive(Debug, Clone)]
struct RuleState {
    rules: Vec<Rule>,
    current_rule: Option<Rule>,
    loading: bool,
    saving: bool,
    error: Option<String>,
    pagination: PaginationInfo,
    filters: RuleFilters,
    search_query: String,
    metrics: HashMap<String, RuleMetrics>,
}

impl RuleState {
    fn new(page_size: u32) -> Self {
        Self {
            rules: Vec::new(),
            current_rule: None,
            loading: false,
            saving: false,
            error: None,
            pagination: PaginationInfo::first_page(page_size),
            filters: RuleFilters::default(),
            search_query: String::new(),
            metrics: HashMap::new(),
        }
    }

    fn set_status(&mut self, id: &str, status: RuleStatus) {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.id == id) {
            rule.status = status;
        }
        if let Some(current) = self.current_rule.as_mut().filter(|r| r.id == id) {
            current.status = status;
        }
    }

    fn remove(&mut self, id: &str) {
        self.rules.retain(|r| r.id != id);
        if self.current_rule.as_ref().is_some_and(|r| r.id == id) {
            self.current_rule = None;
        }
        self.metrics.remove(id);
    }
}

#[derive(Debug, Clone, Copy)]
enum Busy {
    Loading,
    Saving,
}

/// Raises a busy flag and clears the error; lowers the flag on drop
struct BusyGuard<'a> {
    state: &'a Mutex<RuleState>,
    flag: Busy,
}

impl<'a> BusyGuard<'a> {
    fn begin(state: &'a Mutex<RuleState>, flag: Busy) -> Self {
        let mut s = state.lock();
        match flag {
            Busy::Loading => s.loading = true,
            Busy::Saving => s.saving = true,
        }
        s.error = None;
        Self { state, flag }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut s = self.state.lock();
        match self.flag {
            Busy::Loading => s.loading = false,
            Busy::Saving => s.saving = false,
        }
    }
}

/// Rule store
pub struct RuleStore {
    api: Arc<dyn RulesApi>,
    notifications: Arc<dyn NotificationSink>,
    state: Mutex<RuleState>,
    page_size: u32,
}

impl RuleStore {
    pub fn new(api: Arc<dyn RulesApi>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self::with_page_size(api, notifications, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(
        api: Arc<dyn RulesApi>,
        notifications: Arc<dyn NotificationSink>,
        page_size: u32,
    ) -> Self {
        let page_size = page_size.max(1);
        Self {
            api,
            notifications,
            state: Mutex::new(RuleState::new(page_size)),
            page_size,
        }
    }

    fn busy(&self, flag: Busy) -> BusyGuard<'_> {
        BusyGuard::begin(&self.state, flag)
    }

    /// Record a failed action and hand the error back to the caller
    fn fail(&self, title: &str, error: ApiError) -> ApiError {
        let message = error.to_string();
        self.state.lock().error = Some(message.clone());
        self.notifications.show_error(title, &message);
        error
    }

    /// Current page, sort defaults and active criteria, overridden by `overrides`
    fn list_params(&self, overrides: RuleListParams) -> RuleListParams {
        let mut params = {
            let s = self.state.lock();
            let mut params = RuleListParams {
                page: Some(s.pagination.page),
                limit: Some(s.pagination.limit),
                sort_by: Some(DEFAULT_SORT_BY.to_string()),
                sort_order: Some(SortOrder::Desc),
                ..Default::default()
            };
            s.filters.write_query(&s.search_query, &mut params);
            params
        };

        if overrides.page.is_some() {
            params.page = overrides.page;
        }
        if overrides.limit.is_some() {
            params.limit = overrides.limit;
        }
        if overrides.sort_by.is_some() {
            params.sort_by = overrides.sort_by;
        }
        if overrides.sort_order.is_some() {
            params.sort_order = overrides.sort_order;
        }
        if overrides.status.is_some() {
            params.status = overrides.status;
        }
        if overrides.category.is_some() {
            params.category = overrides.category;
        }
        if overrides.search.is_some() {
            params.search = overrides.search;
        }
        params
    }

    // ---- Actions ----

    /// Fetch a page of rules, replacing the collection
    pub async fn fetch_rules(&self, overrides: RuleListParams) -> Result<()> {
        let _busy = self.busy(Busy::Loading);
        let params = self.list_params(overrides);

        match self.api.list_rules(&params).await {
            Ok(response) => {
                let mut s = self.state.lock();
                s.rules = response.data.unwrap_or_default();
                if let Some(pagination) = response.pagination {
                    s.pagination = pagination;
                }
                debug!(count = s.rules.len(), page = s.pagination.page, "Loaded rules");
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to load rules", e)),
        }
    }

    /// Fetch one rule and make it the current rule
    ///
    /// With `use_cache`, a rule already in the collection is returned
    /// without a network call.
    pub async fn fetch_rule(&self, id: &str, use_cache: bool) -> Result<Rule> {
        if use_cache {
            let mut s = self.state.lock();
            if let Some(rule) = s.rules.iter().find(|r| r.id == id).cloned() {
                s.current_rule = Some(rule.clone());
                return Ok(rule);
            }
        }

        let _busy = self.busy(Busy::Loading);
        match self.api.get_rule(id).await {
            Ok(rule) => {
                let mut s = self.state.lock();
                if let Some(slot) = s.rules.iter_mut().find(|r| r.id == id) {
                    *slot = rule.clone();
                }
                s.current_rule = Some(rule.clone());
                Ok(rule)
            }
            Err(e) => Err(self.fail("Failed to load rule", e)),
        }
    }

    /// Create a rule; the server's copy is prepended and becomes current
    pub async fn create_rule(&self, request: CreateRuleRequest) -> Result<Rule> {
        let _busy = self.busy(Busy::Saving);
        match self.api.create_rule(&request).await {
            Ok(rule) => {
                {
                    let mut s = self.state.lock();
                    s.rules.insert(0, rule.clone());
                    s.current_rule = Some(rule.clone());
                }
                self.notifications.show_success("Rule created successfully");
                Ok(rule)
            }
            Err(e) => Err(self.fail("Failed to create rule", e)),
        }
    }

    pub async fn update_rule(&self, id: &str, request: UpdateRuleRequest) -> Result<Rule> {
        let _busy = self.busy(Busy::Saving);
        match self.api.update_rule(id, &request).await {
            Ok(rule) => {
                {
                    let mut s = self.state.lock();
                    if let Some(slot) = s.rules.iter_mut().find(|r| r.id == id) {
                        *slot = rule.clone();
                    }
                    if let Some(current) = s.current_rule.as_mut().filter(|r| r.id == id) {
                        *current = rule.clone();
                    }
                }
                self.notifications.show_success("Rule updated successfully");
                Ok(rule)
            }
            Err(e) => Err(self.fail("Failed to update rule", e)),
        }
    }

    /// Delete a rule; unknown ids leave the collection unchanged
    pub async fn delete_rule(&self, id: &str) -> Result<()> {
        let _busy = self.busy(Busy::Saving);
        match self.api.delete_rule(id).await {
            Ok(()) => {
                self.state.lock().remove(id);
                self.notifications.show_success("Rule deleted successfully");
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to delete rule", e)),
        }
    }

    /// Duplicate a rule client-side through [`RuleStore::create_rule`]
    ///
    /// The source is looked up cache-first. The copy is named
    /// "<name> (Copy)" unless `new_name` is given.
    pub async fn duplicate_rule(&self, id: &str, new_name: Option<&str>) -> Result<Rule> {
        let source = self.fetch_rule(id, true).await?;
        self.create_rule(source.duplicate_request(new_name)).await
    }

    async fn transition(
        &self,
        id: &str,
        status: RuleStatus,
        success: &str,
        failure: &str,
    ) -> Result<()> {
        let _busy = self.busy(Busy::Saving);
        let result = match status {
            RuleStatus::Active => self.api.activate_rule(id).await,
            RuleStatus::Inactive => self.api.deactivate_rule(id).await,
            RuleStatus::UnderReview => self.api.submit_for_approval(id).await,
            RuleStatus::Approved => self.api.approve_rule(id).await,
            RuleStatus::Draft | RuleStatus::Deprecated => {
                return Err(ApiError::precondition(format!(
                    "No transition to {} is available",
                    status
                )))
            }
        };

        match result {
            Ok(_) => {
                self.state.lock().set_status(id, status);
                self.notifications.show_success(success);
                Ok(())
            }
            Err(e) => Err(self.fail(failure, e)),
        }
    }

    pub async fn activate_rule(&self, id: &str) -> Result<()> {
        self.transition(
            id,
            RuleStatus::Active,
            "Rule activated successfully",
            "Failed to activate rule",
        )
        .await
    }

    pub async fn deactivate_rule(&self, id: &str) -> Result<()> {
        self.transition(
            id,
            RuleStatus::Inactive,
            "Rule deactivated successfully",
            "Failed to deactivate rule",
        )
        .await
    }

    pub async fn submit_for_approval(&self, id: &str) -> Result<()> {
        self.transition(
            id,
            RuleStatus::UnderReview,
            "Rule submitted for approval",
            "Failed to submit rule for approval",
        )
        .await
    }

    pub async fn approve_rule(&self, id: &str) -> Result<()> {
        self.transition(
            id,
            RuleStatus::Approved,
            "Rule approved successfully",
            "Failed to approve rule",
        )
        .await
    }

    /// Fetch and cache metrics; failures are logged and yield `None`
    pub async fn fetch_rule_metrics(&self, id: &str) -> Option<RuleMetrics> {
        match self.api.get_rule_metrics(id).await {
            Ok(metrics) => {
                self.state
                    .lock()
                    .metrics
                    .insert(id.to_string(), metrics.clone());
                Some(metrics)
            }
            Err(e) => {
                warn!(rule_id = id, error = %e, "Failed to fetch rule metrics");
                None
            }
        }
    }

    /// Dry-run validation; leaves busy flags and the error slot alone
    pub async fn validate_rule(&self, request: &ValidateRuleRequest) -> Result<ValidationResult> {
        self.api.validate_rule(request).await.map_err(|e| {
            self.notifications
                .show_error("Rule validation failed", &e.to_string());
            e
        })
    }

    // ---- Bulk actions ----
    //
    // One request per id, issued together and joined. The local patch is
    // applied once after every request succeeded. On failure nothing is
    // patched locally and requests that already succeeded stay applied
    // on the server.

    pub async fn bulk_activate(&self, ids: &[String]) -> Result<()> {
        self.bulk_transition(ids, RuleStatus::Active).await
    }

    pub async fn bulk_deactivate(&self, ids: &[String]) -> Result<()> {
        self.bulk_transition(ids, RuleStatus::Inactive).await
    }

    async fn bulk_transition(&self, ids: &[String], status: RuleStatus) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let _busy = self.busy(Busy::Saving);
        let activate = status == RuleStatus::Active;

        let results = join_all(ids.iter().map(|id| async move {
            if activate {
                self.api.activate_rule(id).await
            } else {
                self.api.deactivate_rule(id).await
            }
        }))
        .await;

        let verb = if activate { "activate" } else { "deactivate" };
        if let Some(e) = results.into_iter().find_map(|r| r.err()) {
            return Err(self.fail(&format!("Failed to {} rules", verb), e));
        }

        {
            let mut s = self.state.lock();
            for id in ids {
                s.set_status(id, status);
            }
        }
        self.notifications
            .show_success(&format!("{} rules {}d successfully", ids.len(), verb));
        Ok(())
    }

    pub async fn bulk_delete(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let _busy = self.busy(Busy::Saving);

        let results = join_all(ids.iter().map(|id| self.api.delete_rule(id))).await;
        if let Some(e) = results.into_iter().find_map(|r| r.err()) {
            return Err(self.fail("Failed to delete rules", e));
        }

        {
            let mut s = self.state.lock();
            for id in ids {
                s.remove(id);
            }
        }
        self.notifications
            .show_success(&format!("{} rules deleted successfully", ids.len()));
        Ok(())
    }

    // ---- Criteria ----

    /// Merge filter changes and, if given, new search text; back to page 1
    ///
    /// Does not fetch. Callers that want the matching page follow up with
    /// [`RuleStore::fetch_rules`].
    pub fn set_criteria(&self, patch: FiltersPatch, search: Option<String>) {
        let mut s = self.state.lock();
        s.filters.apply(patch);
        if let Some(search) = search {
            s.search_query = search;
        }
        s.pagination.page = 1;
    }

    /// Merge filter changes, go back to page 1 and re-fetch
    pub async fn update_filters(&self, patch: FiltersPatch) -> Result<()> {
        self.set_criteria(patch, None);
        self.fetch_rules(RuleListParams::default()).await
    }

    /// Replace the search text, go back to page 1 and re-fetch
    pub async fn update_search(&self, query: impl Into<String>) -> Result<()> {
        self.set_criteria(FiltersPatch::default(), Some(query.into()));
        self.fetch_rules(RuleListParams::default()).await
    }

    pub fn clear_error(&self) {
        self.state.lock().error = None;
    }

    pub fn clear_current_rule(&self) {
        self.state.lock().current_rule = None;
    }

    /// Back to the empty initial state (logout, navigation away)
    pub fn reset(&self) {
        *self.state.lock() = RuleState::new(self.page_size);
    }

    // ---- Snapshots ----

    pub fn rules(&self) -> Vec<Rule> {
        self.state.lock().rules.clone()
    }

    pub fn current_rule(&self) -> Option<Rule> {
        self.state.lock().current_rule.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn is_saving(&self) -> bool {
        self.state.lock().saving
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn pagination(&self) -> PaginationInfo {
        self.state.lock().pagination
    }

    pub fn filters(&self) -> RuleFilters {
        self.state.lock().filters.clone()
    }

    pub fn search_query(&self) -> String {
        self.state.lock().search_query.clone()
    }

    pub fn rule_metrics(&self, id: &str) -> Option<RuleMetrics> {
        self.state.lock().metrics.get(id).cloned()
    }

    // ---- Derived views ----

    /// Current page after search and filters
    pub fn filtered_rules(&self) -> Vec<Rule> {
        let s = self.state.lock();
        filter_rules(&s.rules, &s.filters, &s.search_query)
    }

    pub fn rules_stats(&self) -> RulesStats {
        rules_stats(&self.state.lock().rules)
    }

    pub fn rules_by_status(&self, status: RuleStatus) -> Vec<Rule> {
        rules_by_status(&self.state.lock().rules, status)
    }

    pub fn rules_by_priority(&self, priority: Priority) -> Vec<Rule> {
        rules_by_priority(&self.state.lock().rules, priority)
    }
}
