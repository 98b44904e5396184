use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use fileshare_auth::{FileId, FileShareView, Permission, ShareId, UserView};
use serde::Serialize;

use super::Context;
use super::helpers::{find_user, format_timestamp, resolve_user};
use crate::output::{print_empty, print_json, print_success};

#[derive(Subcommand)]
pub enum ShareCommand {
    /// Grant another user access to one of your files
    Grant {
        /// File id
        file: i64,
        /// Recipient username
        to: String,
        /// READ or WRITE
        #[arg(long, default_value = "read")]
        permission: String,
    },
    /// Revoke a share
    Revoke {
        /// Share id
        id: i64,
    },
    /// List shares on a file
    List {
        /// File id
        file: i64,
    },
    /// List users a file is shared with
    Users {
        /// File id
        file: i64,
    },
}

pub async fn run(action: ShareCommand, ctx: &Context) -> Result<()> {
    match action {
        ShareCommand::Grant {
            file,
            to,
            permission,
        } => grant(FileId::new(file), &to, &permission, ctx).await,
        ShareCommand::Revoke { id } => revoke(ShareId::new(id), ctx).await,
        ShareCommand::List { file } => list(FileId::new(file), ctx).await,
        ShareCommand::Users { file } => users(FileId::new(file), ctx).await,
    }
}

async fn grant(file: FileId, to: &str, permission: &str, ctx: &Context) -> Result<()> {
    let user = resolve_user(ctx).await?;
    let grantee = find_user(ctx, to).await?;
    let permission: Permission = permission.parse()?;

    let share = ctx
        .service
        .registry()
        .share(file, user.id, grantee.id, permission)
        .await?;

    if ctx.json_output {
        print_json(&FileShareView::from(&share))?;
    } else {
        print_success(format!(
            "Shared file {file} with {} ({permission})",
            grantee.username.bold()
        ));
        println!("  {}: {}", "Share ID".dimmed(), share.id);
    }
    Ok(())
}

async fn revoke(id: ShareId, ctx: &Context) -> Result<()> {
    let user = resolve_user(ctx).await?;
    ctx.service.ledger().revoke(id, user.id).await?;

    if ctx.json_output {
        #[derive(Serialize)]
        struct Output {
            revoked: ShareId,
        }
        print_json(&Output { revoked: id })?;
    } else {
        print_success(format!("Revoked share {id}"));
    }
    Ok(())
}

async fn list(file: FileId, ctx: &Context) -> Result<()> {
    let user = resolve_user(ctx).await?;
    let shares = ctx.service.registry().shares_for_file(file, user.id).await?;

    if ctx.json_output {
        let views: Vec<_> = shares.iter().map(FileShareView::from).collect();
        print_json(&views)?;
        return Ok(());
    }

    if shares.is_empty() {
        print_empty("No shares on this file.");
        return Ok(());
    }

    println!("{}", "Shares:".bold());
    for share in &shares {
        let grantee = match ctx.service.users().get(share.grantee).await? {
            Some(u) => u.username,
            None => share.grantee.to_string(),
        };
        println!(
            "  {:>4}  {}  {}  {}",
            share.id.to_string().bright_cyan(),
            grantee,
            share.permission,
            format_timestamp(share.shared_at).dimmed()
        );
    }
    Ok(())
}

async fn users(file: FileId, ctx: &Context) -> Result<()> {
    let user = resolve_user(ctx).await?;
    let users = ctx
        .service
        .registry()
        .users_with_access(file, user.id)
        .await?;

    if ctx.json_output {
        let views: Vec<_> = users.iter().map(UserView::from).collect();
        print_json(&views)?;
    } else if users.is_empty() {
        print_empty("Not shared with anyone.");
    } else {
        println!("{}", "Shared with:".bold());
        for user in &users {
            println!("  {}  {}", user.username, user.email.dimmed());
        }
    }
    Ok(())
}
