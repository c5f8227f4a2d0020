// Entrypoint for the CLI application.
// - Keeps `main` small: parse flags, build config and API client, and hand
//   them to the UI loop.
// - Returns `anyhow::Result` so configuration problems exit non-zero.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use finetune_cli::api::ApiClient;
use finetune_cli::config::{Config, Overrides};
use finetune_cli::console::TerminalConsole;
use finetune_cli::ui::main_menu;

/// Interactive helper for preparing training data, uploading it,
/// running fine-tuning jobs and chatting with the resulting models.
#[derive(Parser, Debug)]
#[command(name = "finetune-cli", version, about)]
struct Args {
    /// JSON config file (default: <config dir>/finetune-cli/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long)]
    base_url: Option<String>,

    /// Directory holding training files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Model used when fine-tuning from the base model
    #[arg(long)]
    base_model: Option<String>,

    /// Request timeout in seconds (no timeout when omitted)
    #[arg(long)]
    timeout: Option<u64>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl From<&Args> for Overrides {
    fn from(args: &Args) -> Self {
        Overrides {
            config_path: args.config.clone(),
            base_url: args.base_url.clone(),
            data_dir: args.data_dir.clone(),
            base_model: args.base_model.clone(),
            request_timeout_secs: args.timeout,
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::load(&Overrides::from(&args))?;
    tracing::debug!(base_url = %config.base_url, data_dir = %config.data_dir.display(), "configuration loaded");
    let api = ApiClient::new(&config)?;

    // Start the interactive menu. This call blocks until the user exits.
    let mut console = TerminalConsole;
    main_menu(&api, &mut console, &config)?;
    Ok(())
}
