//! Session commands - login, logout, whoami

use anyhow::{bail, Result};
use colored::Colorize;
use dialoguer::{Input, Password};

use rulesdesk_core::RulesdeskContext;

use crate::output;

pub async fn login(
    ctx: &mut RulesdeskContext,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::<String>::new().with_prompt("Email").interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let response = ctx.session.login(email.trim(), &password).await?;
    ctx.persist_session()?;

    output::success(&format!(
        "Logged in as {} ({})",
        response.user.name, response.user.role
    ));
    Ok(())
}

pub async fn logout(ctx: &mut RulesdeskContext) -> Result<()> {
    if !ctx.token.is_set() {
        output::info("Not logged in");
        return Ok(());
    }

    ctx.session.logout().await;
    ctx.rule_store.reset();
    ctx.persist_session()?;

    output::success("Logged out");
    Ok(())
}

pub async fn whoami(ctx: &RulesdeskContext, json: bool) -> Result<()> {
    if !ctx.token.is_set() {
        bail!("Not logged in. Run `rd login` first.");
    }

    ctx.session.initialize().await;
    let Some(user) = ctx.session.user() else {
        bail!("Session expired. Run `rd login` again.");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.add_row(vec!["Name", user.name.as_str()]);
    table.add_row(vec!["Email", user.email.as_str()]);
    table.add_row(vec!["Role", user.role.as_str()]);
    if let Some(last_login) = &user.last_login {
        table.add_row(vec!["Last login", last_login.as_str()]);
    }
    println!("{}", table);

    let access = if ctx.session.is_admin() {
        "full administrative access"
    } else if ctx.session.is_manager() {
        "can approve and manage rules"
    } else if ctx.session.can_edit() {
        "can edit rules"
    } else {
        "read-only access"
    };
    println!("{}", access.dimmed());
    Ok(())
}
