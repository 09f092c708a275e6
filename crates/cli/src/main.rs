//! OutfitSync CLI — the main entry point.
//!
//! Commands:
//! - `extract` — Show the commands found in a piece of text
//! - `apply`   — Apply commands from text to an outfit
//! - `outfit`  — Show or edit an outfit directly
//! - `render`  — Substitute outfit macros in a template
//! - `preset`  — Manage saved outfits
//! - `run`     — Ask the model for changes and apply them
//! - `watch`   — Re-run whenever the session file changes
//! - `status`  — Show configuration and pipeline state
//! - `config`  — Inspect configuration

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod session_file;

#[derive(Parser)]
#[command(
    name = "outfitsync",
    about = "OutfitSync — outfit state tracking for model-driven roleplay",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

/// Which conversation and outfit a command acts on.
#[derive(Args, Clone)]
pub struct Target {
    /// Session file describing characters and the conversation
    #[arg(short, long, env = "OUTFITSYNC_SESSION")]
    session: PathBuf,

    /// Act on the user's outfit instead of the character's
    #[arg(short, long)]
    user: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the commands found in text (stdin when omitted)
    Extract { text: Option<String> },

    /// Apply the commands found in text (stdin when omitted)
    Apply {
        #[command(flatten)]
        target: Target,
        text: Option<String>,
    },

    /// Show or edit an outfit
    Outfit {
        #[command(flatten)]
        target: Target,
        #[command(subcommand)]
        action: OutfitAction,
    },

    /// Substitute outfit macros such as {{char_headwear}} in a template
    Render {
        #[command(flatten)]
        target: Target,
        template: String,
    },

    /// Manage outfit presets
    Preset {
        #[command(flatten)]
        target: Target,
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Run one model cycle over the session's recent messages
    Run {
        #[command(flatten)]
        target: Target,

        /// Print the rendered system prompt instead of calling the model
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a cycle each time the session file gains messages
    Watch {
        #[command(flatten)]
        target: Target,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },

    /// Show configuration and stored state
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum OutfitAction {
    /// Print every slot
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set one slot
    Set { slot: String, value: String },
    /// Clear one slot
    Remove { slot: String },
    /// Turn prompt injection for this outfit on or off
    Inject {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(Subcommand)]
pub enum PresetAction {
    List,
    Save {
        name: String,
        /// Replace an existing preset
        #[arg(long)]
        overwrite: bool,
    },
    Load { name: String },
    Delete { name: String },
    /// Mark a preset as the default outfit
    Default { name: String },
    ClearDefault,
    /// Wear the default preset, if one is set
    Wear,
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Path,
    Validate,
    /// Print a config file with every default filled in
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Extract { text } => commands::extract::run(text).await?,
        Commands::Apply { target, text } => commands::apply::run(&target, text).await?,
        Commands::Outfit { target, action } => commands::outfit::run(&target, action).await?,
        Commands::Render { target, template } => commands::render::run(&target, &template).await?,
        Commands::Preset { target, action } => commands::preset::run(&target, action).await?,
        Commands::Run { target, dry_run } => commands::run::run(&target, dry_run).await?,
        Commands::Watch { target, interval_ms } => commands::run::watch(&target, interval_ms).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Init => commands::config_cmd::init().await?,
        },
    }

    Ok(())
}
