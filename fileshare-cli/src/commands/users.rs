use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use fileshare_auth::UserView;

use super::Context;
use super::helpers::format_timestamp;
use crate::output::{print_empty, print_json, print_success};

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a new user
    Register {
        username: String,
        email: String,
        /// Opaque credential hash, stored as given
        #[arg(long, default_value = "")]
        credential_hash: String,
    },
    /// List registered users
    List,
}

pub async fn run(action: UserCommand, ctx: &Context) -> Result<()> {
    match action {
        UserCommand::Register {
            username,
            email,
            credential_hash,
        } => register(&username, &email, &credential_hash, ctx).await,
        UserCommand::List => list(ctx).await,
    }
}

async fn register(username: &str, email: &str, credential_hash: &str, ctx: &Context) -> Result<()> {
    let user = ctx
        .service
        .users()
        .register(username, email, credential_hash)
        .await?;

    if ctx.json_output {
        print_json(&UserView::from(&user))?;
    } else {
        print_success(format!("Registered {}", user.username.bold()));
        println!("  {}: {}", "ID".dimmed(), user.id);
    }
    Ok(())
}

async fn list(ctx: &Context) -> Result<()> {
    let users = ctx.service.users().list().await?;

    if ctx.json_output {
        let views: Vec<_> = users.iter().map(UserView::from).collect();
        print_json(&views)?;
    } else if users.is_empty() {
        print_empty("No users registered.");
    } else {
        println!("{}", "Users:".bold());
        for user in &users {
            println!(
                "  {:>4}  {}  {}  {}",
                user.id.to_string().bright_cyan(),
                user.username,
                user.email.dimmed(),
                format_timestamp(user.created_at).dimmed()
            );
        }
    }
    Ok(())
}
