use anyhow::Result;
use clap::{Parser, Subcommand};
use fileshare_auth::{Config, FileShareService};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "fileshare")]
#[command(about = "Upload files and share them with other users")]
#[command(version)]
struct Cli {
    /// Output format
    #[arg(long, global = true)]
    json: bool,

    /// User to act as
    #[arg(long = "as", global = true, env = "FILESHARE_USER")]
    acting_as: Option<String>,

    /// Keep blobs and metadata under this directory
    #[arg(long, global = true, env = "FILESHARE_DATA_DIR")]
    data_dir: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: commands::users::UserCommand,
    },
    /// Manage files
    File {
        #[command(subcommand)]
        action: commands::files::FileCommand,
    },
    /// Manage file shares
    Share {
        #[command(subcommand)]
        action: commands::share::ShareCommand,
    },
}

/// `--data-dir` selects on-disk backends over whatever the config file says
fn load_config(data_dir: Option<&str>) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(dir) = data_dir {
        config.storage.backend = "local".into();
        config.storage.local_path = Some(format!("{dir}/blobs"));
        config.metadata.backend = "sqlite".into();
        config.metadata.sqlite_path = Some(format!("{dir}/fileshare.db"));
        debug!(data_dir = dir, "using on-disk backends");
    }
    debug!(
        storage = %config.storage.backend,
        metadata = %config.metadata.backend,
        max_upload_bytes = config.limits.max_upload_bytes,
        "loaded config"
    );
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fileshare=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fileshare=info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(dir) = &cli.data_dir {
        tokio::fs::create_dir_all(dir).await?;
    }
    let config = load_config(cli.data_dir.as_deref())?;
    let service = FileShareService::from_config(&config).await?;

    let ctx = commands::Context {
        json_output: cli.json,
        acting_as: cli.acting_as,
        service,
    };

    match cli.command {
        Commands::User { action } => commands::users::run(action, &ctx).await,
        Commands::File { action } => commands::files::run(action, &ctx).await,
        Commands::Share { action } => commands::share::run(action, &ctx).await,
    }
}
