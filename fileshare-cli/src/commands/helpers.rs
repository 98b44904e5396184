// Common helper functions

use std::path::Path;

use anyhow::{Result, bail};
use fileshare_auth::{FileId, User};

use super::Context;

/// The user named by `--as` / `$FILESHARE_USER`
pub async fn resolve_user(ctx: &Context) -> Result<User> {
    let Some(name) = ctx.acting_as.as_deref() else {
        bail!("No user specified. Use --as <username> or set FILESHARE_USER");
    };
    find_user(ctx, name).await
}

pub async fn find_user(ctx: &Context, username: &str) -> Result<User> {
    match ctx.service.users().find_by_username(username).await? {
        Some(user) => Ok(user),
        None => bail!("User '{username}' not found"),
    }
}

/// Where a download lands when no `--output` is given
///
/// Stored filenames come from whoever uploaded the file, so only the final
/// component is kept. Anything that is not a plain name becomes `{id}.bin`.
pub fn local_file_name(original: Option<&str>, id: FileId) -> String {
    original
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty() && *name != "." && *name != ".." && !name.contains('\\'))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{id}.bin"))
}

pub fn format_timestamp(ts: u64) -> String {
    use chrono::{DateTime, Utc};
    let dt = DateTime::<Utc>::from_timestamp(ts as i64, 0).unwrap_or_else(Utc::now);
    dt.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    match bytes {
        b if b >= MIB => format!("{:.1} MiB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KiB", b as f64 / KIB as f64),
        b => format!("{b} B"),
    }
}
