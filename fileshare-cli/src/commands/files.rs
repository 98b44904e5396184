use anyhow::{Context as AnyhowContext, Result};
use clap::Subcommand;
use colored::Colorize;
use fileshare_auth::{File, FileId, FileView};
use serde::Serialize;
use std::path::Path;

use super::Context;
use super::helpers::{format_size, format_timestamp, local_file_name, resolve_user};
use crate::output::{print_empty, print_json, print_success};

#[derive(Subcommand)]
pub enum FileCommand {
    /// Upload a file
    Upload {
        /// File to upload
        file: String,
        /// Declared content type
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
    },
    /// Download a file
    Download {
        /// File id
        id: i64,
        /// Output file
        #[arg(long)]
        output: Option<String>,
    },
    /// List owned files, or files shared with you
    List {
        #[arg(long)]
        shared: bool,
    },
    /// Show file details
    Info {
        /// File id
        id: i64,
    },
    /// Replace a file's content
    Overwrite {
        /// File id
        id: i64,
        /// New content
        file: String,
    },
    /// Delete a file
    Delete {
        /// File id
        id: i64,
    },
}

pub async fn run(action: FileCommand, ctx: &Context) -> Result<()> {
    match action {
        FileCommand::Upload { file, content_type } => upload(file, content_type, ctx).await,
        FileCommand::Download { id, output } => download(FileId::new(id), output, ctx).await,
        FileCommand::List { shared } => list(shared, ctx).await,
        FileCommand::Info { id } => info(FileId::new(id), ctx).await,
        FileCommand::Overwrite { id, file } => overwrite(FileId::new(id), file, ctx).await,
        FileCommand::Delete { id } => delete(FileId::new(id), ctx).await,
    }
}

async fn upload(file_path: String, content_type: String, ctx: &Context) -> Result<()> {
    let user = resolve_user(ctx).await?;

    let data = tokio::fs::read(&file_path)
        .await
        .with_context(|| format!("Failed to read {file_path}"))?;
    // Only the final component is kept for display
    let filename = Path::new(&file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.clone());

    let file = ctx
        .service
        .registry()
        .create(user.id, &filename, &data, &content_type)
        .await?;

    if ctx.json_output {
        print_json(&FileView::from(&file))?;
    } else {
        print_success(format!("Uploaded {file_path}"));
        println!("  {}: {}", "ID".dimmed(), file.id);
        println!("  {}: {}", "Size".dimmed(), format_size(file.size));
    }
    Ok(())
}

async fn download(id: FileId, output_override: Option<String>, ctx: &Context) -> Result<()> {
    let user = resolve_user(ctx).await?;
    let registry = ctx.service.registry();

    let data = registry.read_content(id, user.id).await?;
    let output_path = match output_override {
        Some(path) => path,
        None => {
            let name = registry.get(id).await?.map(|f| f.original_filename);
            local_file_name(name.as_deref(), id)
        }
    };

    tokio::fs::write(&output_path, &data)
        .await
        .with_context(|| format!("Failed to write {output_path}"))?;

    if ctx.json_output {
        #[derive(Serialize)]
        struct Output {
            id: FileId,
            output: String,
            size: usize,
        }
        print_json(&Output {
            id,
            output: output_path,
            size: data.len(),
        })?;
    } else {
        print_success(format!(
            "Downloaded to {} ({})",
            output_path,
            format_size(data.len() as u64)
        ));
    }
    Ok(())
}

async fn list(shared: bool, ctx: &Context) -> Result<()> {
    let user = resolve_user(ctx).await?;
    let registry = ctx.service.registry();

    let files = if shared {
        registry.list_shared_with(user.id).await?
    } else {
        registry.list_owned_by(user.id).await?
    };

    if ctx.json_output {
        let views: Vec<_> = files.iter().map(FileView::from).collect();
        print_json(&views)?;
    } else if files.is_empty() {
        print_empty("No files found.");
    } else {
        let heading = if shared { "Shared with you:" } else { "Files:" };
        println!("{}", heading.bold());
        for file in &files {
            print_row(file);
        }
        println!();
        println!("{} file(s)", files.len());
    }
    Ok(())
}

fn print_row(file: &File) {
    println!(
        "  {:>4}  {}  {}  {}",
        file.id.to_string().bright_cyan(),
        file.original_filename,
        format_size(file.size).dimmed(),
        format_timestamp(file.uploaded_at).dimmed()
    );
}

async fn info(id: FileId, ctx: &Context) -> Result<()> {
    let user = resolve_user(ctx).await?;
    let registry = ctx.service.registry();

    let Some(file) = registry.get(id).await? else {
        anyhow::bail!("File {id} not found");
    };
    // Details are only shown to users who may read the file
    if !ctx.service.authorizer().can_read(&file, user.id).await? {
        anyhow::bail!("Access denied");
    }

    if ctx.json_output {
        print_json(&FileView::from(&file))?;
    } else {
        println!("{}", file.original_filename.bold());
        println!("  {}: {}", "ID".dimmed(), file.id);
        println!("  {}: {}", "Owner".dimmed(), file.owner);
        println!("  {}: {}", "Size".dimmed(), format_size(file.size));
        println!("  {}: {}", "Type".dimmed(), file.content_type);
        println!("  {}: {}", "Digest".dimmed(), file.digest);
        println!("  {}: {}", "Uploaded".dimmed(), format_timestamp(file.uploaded_at));
    }
    Ok(())
}

async fn overwrite(id: FileId, file_path: String, ctx: &Context) -> Result<()> {
    let user = resolve_user(ctx).await?;

    let data = tokio::fs::read(&file_path)
        .await
        .with_context(|| format!("Failed to read {file_path}"))?;
    let file = ctx.service.registry().overwrite(id, user.id, &data).await?;

    if ctx.json_output {
        print_json(&FileView::from(&file))?;
    } else {
        print_success(format!(
            "Replaced content of {} ({})",
            file.original_filename,
            format_size(file.size)
        ));
    }
    Ok(())
}

async fn delete(id: FileId, ctx: &Context) -> Result<()> {
    let user = resolve_user(ctx).await?;
    ctx.service.registry().delete(id, user.id).await?;

    if ctx.json_output {
        #[derive(Serialize)]
        struct Output {
            deleted: FileId,
        }
        print_json(&Output { deleted: id })?;
    } else {
        print_success(format!("Deleted file {id}"));
    }
    Ok(())
}
