use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use tabvault_etl::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "tabvault", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the tab cache (default: ~/.local/share/tabvault/tabvault.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Resolve a tab and print it
    ///
    /// The key is the tab's path on the remote site, e.g.
    /// `oasis/wonderwall-chords-27596`, or the full page URL.
    ///
    /// A cached copy is used when one exists. Otherwise the page is fetched,
    /// its embedded data is normalized, and the song, the tab, and
    /// placeholders for every sibling version are written to the cache.
    /// Sibling versions show up in the output and can be fetched in turn.
    ///
    /// Exit status is non-zero when the tab cannot be found.
    Get {
        /// Tab path or URL
        key: String,

        /// Print the document as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List cached tabs that have content
    List,
    /// Show cache statistics
    Status,
    /// Inspect or edit configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print one value, or the whole config file
    Get { key: Option<String> },
    /// Set a value in the config file
    Set { key: String, value: String },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

fn setup_logging(config: &Config) -> Result<()> {
    let level = match config.logging.level.to_ascii_lowercase().as_str() {
        "trace" => twyg::LogLevel::Trace,
        "debug" => twyg::LogLevel::Debug,
        "warn" => twyg::LogLevel::Warn,
        "error" => twyg::LogLevel::Error,
        _ => twyg::LogLevel::Info,
    };

    let opts = twyg::OptsBuilder::new()
        .coloured(config.logging.coloured)
        .level(level)
        .report_caller(false)
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid logging options: {e:?}"))?;

    twyg::setup(opts).map_err(|e| anyhow::anyhow!("Could not set up logger: {e:?}"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.db {
        Some(db) => Config::load_with_db_path(db)?,
        None => Config::load()?,
    };
    setup_logging(&config)?;

    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Get { key, json } => {
            let found = commands::get_tab(&config, &key, json).await?;
            if !found {
                std::process::exit(1);
            }
        }
        Commands::List => commands::list_tabs(&config)?,
        Commands::Status => commands::show_status(&config)?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(&config)?,
            ConfigAction::Get { key } => commands::config::get_config(&config, key)?,
            ConfigAction::Set { key, value } => commands::config::set_config(&key, &value)?,
            ConfigAction::Path => commands::config::show_path(),
            ConfigAction::Example => commands::config::show_example(),
            ConfigAction::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}
