//! Core domain entities
//!
//! All entities are defined here. These are pure data structures and
//! pure functions over them - no I/O or external dependencies.

pub mod filter;
mod notification;
pub mod result;
mod rule;
mod user;

pub use filter::{DateRange, FiltersPatch, RuleFilters, RulesStats};
pub use notification::{Notification, NotificationType, AUTO_DISMISS_SECS};
pub use result::{ApiError, ApiResponse, ErrorCategory, PaginationInfo};
pub use rule::{
    CreateRuleRequest, ExportFormat, ImportResult, Priority, Rule, RuleHistoryEntry,
    RuleListParams, RuleMetrics, RuleStatus, SortOrder, UpdateRuleRequest, ValidateRuleRequest,
    ValidationResult,
};
pub use user::{
    ChangePasswordRequest, LoginRequest, LoginResponse, UpdateUserRequest, User, UserRole,
};
