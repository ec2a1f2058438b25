//! Output formatting utilities

use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

use rulesdesk_core::domain::{Notification, NotificationType, Rule, RuleStatus};
use rulesdesk_core::services::NotificationQueue;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn status_color(status: RuleStatus) -> Color {
    match status {
        RuleStatus::Active => Color::Green,
        RuleStatus::Approved => Color::Cyan,
        RuleStatus::UnderReview => Color::Yellow,
        RuleStatus::Inactive | RuleStatus::Deprecated => Color::DarkGrey,
        RuleStatus::Draft => Color::Reset,
    }
}

/// Status cell colored by lifecycle stage
pub fn status_cell(status: RuleStatus) -> Cell {
    Cell::new(status.as_str()).fg(status_color(status))
}

/// One row per rule
pub fn rules_table(rules: &[Rule]) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        "ID", "Name", "Status", "Priority", "Category", "Version", "Tags",
    ]);
    for rule in rules {
        table.add_row(vec![
            Cell::new(&rule.id),
            Cell::new(&rule.name),
            status_cell(rule.status),
            Cell::new(rule.priority.as_str()),
            Cell::new(&rule.category),
            Cell::new(rule.version),
            Cell::new(rule.tags.join(", ")),
        ]);
    }
    table
}

/// Key-value view of a single rule
pub fn rule_details(rule: &Rule) -> Table {
    let mut table = create_table();
    table.add_row(vec![Cell::new("ID"), Cell::new(&rule.id)]);
    table.add_row(vec![Cell::new("Name"), Cell::new(&rule.name)]);
    table.add_row(vec![Cell::new("Status"), status_cell(rule.status)]);
    table.add_row(vec![Cell::new("Priority"), Cell::new(rule.priority.as_str())]);
    table.add_row(vec![Cell::new("Category"), Cell::new(&rule.category)]);
    table.add_row(vec![Cell::new("Version"), Cell::new(rule.version)]);
    table.add_row(vec![Cell::new("Created by"), Cell::new(&rule.created_by)]);
    table.add_row(vec![Cell::new("Created"), Cell::new(&rule.created_at)]);
    table.add_row(vec![Cell::new("Updated"), Cell::new(&rule.updated_at)]);
    table.add_row(vec![Cell::new("Tags"), Cell::new(rule.tags.join(", "))]);
    table.add_row(vec![Cell::new("Description"), Cell::new(&rule.description)]);
    table
}

fn notification_line(n: &Notification) -> ColoredString {
    let text = if n.message == n.title {
        n.title.clone()
    } else {
        format!("{}: {}", n.title, n.message)
    };
    match n.kind {
        NotificationType::Success => format!("✓ {}", text).green(),
        NotificationType::Error => format!("✗ {}", text).red(),
        NotificationType::Warning => format!("! {}", text).yellow(),
        NotificationType::Info => format!("i {}", text).cyan(),
    }
}

/// Print and empty the notification queue, oldest first
pub fn notifications(queue: &NotificationQueue) {
    for n in queue.drain() {
        match n.kind {
            NotificationType::Error | NotificationType::Warning => {
                eprintln!("{}", notification_line(&n))
            }
            NotificationType::Success | NotificationType::Info => {
                println!("{}", notification_line(&n))
            }
        }
    }
}
