//! Rules commands - list, inspect and change rules

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use dialoguer::Confirm;
use serde_json::{json, Value as JsonValue};

use rulesdesk_core::domain::{
    CreateRuleRequest, ExportFormat, FiltersPatch, Priority, RuleListParams, RuleStatus,
    UpdateRuleRequest, ValidateRuleRequest,
};
use rulesdesk_core::ports::RulesApi;
use rulesdesk_core::RulesdeskContext;

use super::ids_or_stdin;
use crate::output;

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List rules (one page)
    List {
        /// Status filter, comma-separated (e.g. ACTIVE,DRAFT)
        #[arg(long, value_delimiter = ',')]
        status: Vec<RuleStatus>,
        /// Priority filter, comma-separated
        #[arg(long, value_delimiter = ',')]
        priority: Vec<Priority>,
        /// Exact category
        #[arg(long)]
        category: Option<String>,
        /// Author substring
        #[arg(long)]
        created_by: Option<String>,
        /// Tag filter, comma-separated
        #[arg(long, value_delimiter = ',')]
        tag: Vec<String>,
        /// Search name, description and tags
        #[arg(long, short)]
        search: Option<String>,
        /// Page number (1-based)
        #[arg(long)]
        page: Option<u32>,
        /// Page size
        #[arg(long)]
        limit: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one rule
    Show {
        id: String,
        /// Include evaluation metrics
        #[arg(long)]
        metrics: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a rule
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Rule source
        #[arg(long, conflicts_with = "dsl_file")]
        dsl: Option<String>,
        /// Read rule source from file
        #[arg(long)]
        dsl_file: Option<PathBuf>,
        #[arg(long, default_value = "MEDIUM")]
        priority: Priority,
        #[arg(long)]
        category: String,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update a rule; only given fields change
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "dsl_file")]
        dsl: Option<String>,
        #[arg(long)]
        dsl_file: Option<PathBuf>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        category: Option<String>,
        /// Replace tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a rule
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Activate a rule
    Activate { id: String },

    /// Deactivate a rule
    Deactivate { id: String },

    /// Submit a rule for approval
    Submit { id: String },

    /// Approve a rule under review
    Approve { id: String },

    /// Copy a rule as a new draft
    Duplicate {
        id: String,
        /// Name of the copy (default: "<name> (Copy)")
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply an action to many rules (IDs from arguments or stdin)
    Bulk {
        #[arg(value_enum)]
        action: BulkAction,
        ids: Vec<String>,
        /// Skip confirmation prompt for delete
        #[arg(long, short)]
        force: bool,
    },

    /// Validate rule source without saving
    Validate {
        #[arg(long, conflicts_with = "file")]
        dsl: Option<String>,
        /// Read rule source from file
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        category: Option<String>,
        /// Sample input as JSON
        #[arg(long)]
        test_data: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a rule against sample input
    Test {
        id: String,
        /// Sample input as JSON
        #[arg(long, conflicts_with = "file")]
        data: Option<String>,
        /// Read sample input from a JSON file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show the change history of a rule
    History {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show evaluation metrics of a rule
    Metrics {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count rules per status on the current page
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download all rules as a file
    Export {
        /// json, csv or xlsx
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// Output path (default: rules.<format>)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Upload rules from a file
    Import {
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BulkAction {
    Activate,
    Deactivate,
    Delete,
}

pub async fn run(ctx: &RulesdeskContext, command: RulesCommands) -> Result<()> {
    match command {
        RulesCommands::List {
            status,
            priority,
            category,
            created_by,
            tag,
            search,
            page,
            limit,
            json,
        } => {
            let patch = FiltersPatch {
                status: Some(status),
                priority: Some(priority),
                category: Some(category.unwrap_or_default()),
                created_by: Some(created_by.unwrap_or_default()),
                date_range: None,
                tags: Some(tag),
            };
            list(ctx, patch, search, page, limit, json).await
        }
        RulesCommands::Show { id, metrics, json } => show(ctx, &id, metrics, json).await,
        RulesCommands::Create {
            name,
            description,
            dsl,
            dsl_file,
            priority,
            category,
            tags,
            json,
        } => {
            let Some(dsl_content) = read_source(dsl, dsl_file.as_deref())? else {
                bail!("Rule source is required (--dsl or --dsl-file)");
            };
            let request = CreateRuleRequest {
                name,
                description,
                dsl_content,
                priority,
                category,
                tags,
            };
            let rule = ctx.rule_store.create_rule(request).await?;
            print_rule(&rule, json)
        }
        RulesCommands::Update {
            id,
            name,
            description,
            dsl,
            dsl_file,
            priority,
            category,
            tags,
            json,
        } => {
            let request = UpdateRuleRequest {
                name,
                description,
                dsl_content: read_source(dsl, dsl_file.as_deref())?,
                priority,
                category,
                tags,
            };
            if request.is_empty() {
                bail!("Nothing to update");
            }
            let rule = ctx.rule_store.update_rule(&id, request).await?;
            print_rule(&rule, json)
        }
        RulesCommands::Delete { id, force } => {
            if !force && !confirm(&format!("This will permanently delete rule '{}'.", id))? {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }
            ctx.rule_store.delete_rule(&id).await?;
            Ok(())
        }
        RulesCommands::Activate { id } => Ok(ctx.rule_store.activate_rule(&id).await?),
        RulesCommands::Deactivate { id } => Ok(ctx.rule_store.deactivate_rule(&id).await?),
        RulesCommands::Submit { id } => Ok(ctx.rule_store.submit_for_approval(&id).await?),
        RulesCommands::Approve { id } => Ok(ctx.rule_store.approve_rule(&id).await?),
        RulesCommands::Duplicate { id, name, json } => {
            let copy = ctx.rule_store.duplicate_rule(&id, name.as_deref()).await?;
            print_rule(&copy, json)
        }
        RulesCommands::Bulk { action, ids, force } => bulk(ctx, action, ids, force).await,
        RulesCommands::Validate {
            dsl,
            file,
            category,
            test_data,
            json,
        } => validate(ctx, dsl, file, category, test_data, json).await,
        RulesCommands::Test { id, data, file } => {
            let input = match (data, file) {
                (Some(data), _) => parse_json(&data)?,
                (None, Some(path)) => parse_json(&read_file(&path)?)?,
                (None, None) => json!({}),
            };
            let outcome = ctx.rules_api.test_rule(&id, &input).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        RulesCommands::History { id, json } => history(ctx, &id, json).await,
        RulesCommands::Metrics { id, json } => {
            let Some(metrics) = ctx.rule_store.fetch_rule_metrics(&id).await else {
                bail!("Metrics are not available for rule '{}'", id);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                print_metrics(&metrics);
            }
            Ok(())
        }
        RulesCommands::Stats { json } => stats(ctx, json).await,
        RulesCommands::Export { format, output } => {
            let path =
                output.unwrap_or_else(|| PathBuf::from(format!("rules.{}", format.extension())));
            let bytes = ctx.rules_api.export_rules(format, None).await?;
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output::success(&format!(
                "Exported {} bytes to {}",
                bytes.len(),
                path.display()
            ));
            Ok(())
        }
        RulesCommands::Import { file, json } => import(ctx, &file, json).await,
    }
}

async fn list(
    ctx: &RulesdeskContext,
    patch: FiltersPatch,
    search: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let store = &ctx.rule_store;
    store.set_criteria(patch, Some(search.unwrap_or_default()));
    store
        .fetch_rules(RuleListParams {
            page,
            limit,
            ..Default::default()
        })
        .await?;

    let rules = store.filtered_rules();
    let pagination = store.pagination();

    if json {
        let body = json!({ "rules": rules, "pagination": pagination });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if rules.is_empty() {
        output::info("No rules found");
        return Ok(());
    }

    println!("{}", output::rules_table(&rules));
    println!(
        "{}",
        format!(
            "Page {} of {} ({} rules total)",
            pagination.page,
            pagination.total_pages.max(1),
            pagination.total
        )
        .dimmed()
    );
    Ok(())
}

async fn show(ctx: &RulesdeskContext, id: &str, with_metrics: bool, json: bool) -> Result<()> {
    let rule = ctx.rule_store.fetch_rule(id, false).await?;
    let metrics = if with_metrics {
        ctx.rule_store.fetch_rule_metrics(id).await
    } else {
        None
    };

    if json {
        let mut body = serde_json::to_value(&rule)?;
        if let Some(metrics) = &metrics {
            body["metrics"] = JsonValue::Object(metrics.clone());
        }
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{}", output::rule_details(&rule));
    if !rule.dsl_content.is_empty() {
        println!("\n{}", "Source".bold());
        println!("{}", rule.dsl_content);
    }
    if let Some(metrics) = &metrics {
        println!("\n{}", "Metrics".bold());
        print_metrics(metrics);
    }
    Ok(())
}

async fn bulk(
    ctx: &RulesdeskContext,
    action: BulkAction,
    ids: Vec<String>,
    force: bool,
) -> Result<()> {
    let ids = ids_or_stdin(ids)?;
    if ids.is_empty() {
        bail!("No rule IDs provided. Pass IDs as arguments or pipe them from stdin.");
    }

    match action {
        BulkAction::Activate => ctx.rule_store.bulk_activate(&ids).await?,
        BulkAction::Deactivate => ctx.rule_store.bulk_deactivate(&ids).await?,
        BulkAction::Delete => {
            let prompt = format!("This will permanently delete {} rule(s).", ids.len());
            if !force && !confirm(&prompt)? {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }
            ctx.rule_store.bulk_delete(&ids).await?
        }
    }
    Ok(())
}

async fn validate(
    ctx: &RulesdeskContext,
    dsl: Option<String>,
    file: Option<PathBuf>,
    category: Option<String>,
    test_data: Option<String>,
    json: bool,
) -> Result<()> {
    let Some(dsl_content) = read_source(dsl, file.as_deref())? else {
        bail!("Rule source is required (--dsl or --file)");
    };
    let request = ValidateRuleRequest {
        dsl_content,
        context: None,
        rule_category: category,
        test_data: test_data.as_deref().map(parse_json).transpose()?,
    };

    let result = ctx.rule_store.validate_rule(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.is_valid {
        output::success("✓ Rule is valid");
    } else {
        for error in &result.errors {
            eprintln!("  {}", error);
        }
    }

    if !result.is_valid {
        bail!("Rule is invalid ({} error(s))", result.errors.len());
    }
    Ok(())
}

async fn history(ctx: &RulesdeskContext, id: &str, json: bool) -> Result<()> {
    let entries = ctx.rules_api.get_rule_history(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        output::info("No history recorded");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Version", "Action", "Changed by", "Changed at"]);
    for entry in &entries {
        table.add_row(vec![
            entry.version.map(|v| v.to_string()).unwrap_or_default(),
            entry.action.clone().unwrap_or_default(),
            entry.changed_by.clone().unwrap_or_default(),
            entry.changed_at.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

async fn stats(ctx: &RulesdeskContext, json: bool) -> Result<()> {
    ctx.rule_store.fetch_rules(RuleListParams::default()).await?;
    let stats = ctx.rule_store.rules_stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.add_row(vec!["Total", &stats.total.to_string()]);
    table.add_row(vec!["Active", &stats.active.to_string()]);
    table.add_row(vec!["Draft", &stats.draft.to_string()]);
    table.add_row(vec!["Under review", &stats.under_review.to_string()]);
    table.add_row(vec!["Deprecated", &stats.deprecated.to_string()]);
    println!("{}", table);

    let total = ctx.rule_store.pagination().total;
    if total > stats.total as u64 {
        output::warning(&format!(
            "Counts cover the first page only ({} of {} rules)",
            stats.total, total
        ));
    }
    Ok(())
}

async fn import(ctx: &RulesdeskContext, file: &Path, json: bool) -> Result<()> {
    let contents =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "rules".to_string());

    let result = ctx.rules_api.import_rules(&file_name, contents).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    output::success(&format!("Imported {} rule(s)", result.imported));
    if !result.errors.is_empty() {
        output::warning(&format!("{} row(s) failed:", result.errors.len()));
        for error in &result.errors {
            eprintln!("  {}", error);
        }
    }
    Ok(())
}

fn print_rule(rule: &rulesdesk_core::Rule, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rule)?);
    } else {
        println!("{}", output::rule_details(rule));
    }
    Ok(())
}

fn print_metrics(metrics: &serde_json::Map<String, JsonValue>) {
    let mut table = output::create_table();
    for (key, value) in metrics {
        let shown = match value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        table.add_row(vec![key.clone(), shown]);
    }
    println!("{}", table);
}

fn confirm(warning: &str) -> Result<bool> {
    println!("\n{}", warning.yellow());
    Ok(Confirm::new()
        .with_prompt("Are you sure?")
        .default(false)
        .interact()?)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Inline source wins over a file
fn read_source(inline: Option<String>, file: Option<&Path>) -> Result<Option<String>> {
    match (inline, file) {
        (Some(source), _) => Ok(Some(source)),
        (None, Some(path)) => read_file(path).map(Some),
        (None, None) => Ok(None),
    }
}

fn parse_json(raw: &str) -> Result<JsonValue> {
    serde_json::from_str(raw).context("Invalid JSON input")
}
