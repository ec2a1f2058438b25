//! CLI command implementations

pub mod auth;
pub mod rules;

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use rulesdesk_core::RulesdeskContext;

/// Get the rulesdesk directory from environment or default
pub fn get_rulesdesk_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RULESDESK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".rulesdesk"))
}

/// Get or create rulesdesk context
pub fn get_context() -> Result<RulesdeskContext> {
    let rulesdesk_dir = get_rulesdesk_dir()?;

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&rulesdesk_dir)
        .with_context(|| format!("Failed to create rulesdesk directory: {:?}", rulesdesk_dir))?;

    RulesdeskContext::new(&rulesdesk_dir)
}

/// IDs from arguments, or from stdin when none were given and input is piped
///
/// Piped input is split on newlines if it has any, otherwise on commas.
pub fn ids_or_stdin(ids: Vec<String>) -> Result<Vec<String>> {
    if !ids.is_empty() || atty::is(atty::Stream::Stdin) {
        return Ok(ids);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(split_ids(&buffer))
}

fn split_ids(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    let parts: Vec<&str> = if trimmed.contains('\n') {
        trimmed.lines().collect()
    } else {
        trimmed.split(',').collect()
    };
    parts
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
