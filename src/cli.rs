use crate::commit::{self, GenOptions};
use crate::config::Config;
use crate::git::GitRepo;
use crate::log_debug;
use crate::providers::{BackendConfig, BackendTier};
use crate::ui;
use anyhow::{Context, Result};
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand, crate_version};
use std::path::PathBuf;

const LOG_FILE: &str = "git-quill-debug.log";

/// CLI structure defining the available commands and global arguments
#[derive(Parser)]
#[command(
    author,
    version = crate_version!(),
    about = "Git-Quill: commit message options from your staged changes",
    long_about = "Git-Quill reads your staged changes, asks one or more language model backends for commit message options, and writes the one you pick into the pending commit message.",
    styles = get_styles(),
)]
pub struct Cli {
    /// Subcommands available for the CLI
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log debug messages to a file
    #[arg(
        short = 'l',
        long = "log",
        global = true,
        help = "Log debug messages to a file"
    )]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(
        long = "log-file",
        global = true,
        help = "Specify a custom log file path"
    )]
    pub log_file: Option<String>,

    /// Suppress non-essential output (spinners, waiting messages, etc.)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress non-essential output"
    )]
    pub quiet: bool,
}

/// Enumeration of available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate commit message options for the staged changes
    #[command(
        about = "Generate commit message options",
        long_about = "Query every configured backend concurrently and list the commit message options as they arrive. The selected option is written to the repository's pending commit message."
    )]
    Gen {
        /// Repository path (defaults to the current directory)
        #[arg(long, help = "Repository path (defaults to the current directory)")]
        path: Option<PathBuf>,

        /// Print the selected (default: first) option to stdout and exit
        #[arg(short, long, help = "Print the selected option to stdout and exit")]
        print: bool,

        /// Choose option N without prompting
        #[arg(short, long, value_name = "N", help = "Choose option N without prompting")]
        select: Option<usize>,

        /// Only query backends with the fast tier
        #[arg(long, help = "Only query backends with the fast tier")]
        fast_only: bool,
    },

    /// Show what would be sent without calling any backend
    #[command(
        about = "Show the classified changes and the assembled prompt",
        long_about = "Collect and classify the staged changes, apply the size limits and print the resulting prompt. No backend is called."
    )]
    Inspect {
        /// Repository path (defaults to the current directory)
        #[arg(long, help = "Repository path (defaults to the current directory)")]
        path: Option<PathBuf>,
    },

    /// Show or change the personal configuration
    #[command(about = "Show or change Git-Quill settings")]
    Config {
        /// Backend id to create or update
        #[arg(long, help = "Backend id to create or update")]
        backend: Option<String>,

        /// Tier for the backend (fast, deep)
        #[arg(long, help = "Tier for the backend (fast, deep)")]
        tier: Option<BackendTier>,

        /// Chat completion endpoint URL for the backend
        #[arg(long, help = "Chat completion endpoint URL for the backend")]
        endpoint: Option<String>,

        /// Model name for the backend
        #[arg(long, help = "Model name for the backend")]
        model: Option<String>,

        /// API key for the backend
        #[arg(long, help = "API key for the backend")]
        api_key: Option<String>,

        /// Environment variable that holds the API key
        #[arg(long, help = "Environment variable that holds the API key")]
        api_key_env: Option<String>,
    },
}

/// Define custom styles for Clap
fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Main function to parse arguments and handle the command
pub async fn main() -> Result<()> {
    let cli = parse_args();

    if cli.log {
        crate::logger::enable_logging();
        let log_file = cli.log_file.as_deref().unwrap_or(LOG_FILE);
        crate::logger::set_log_file(log_file)?;
    } else {
        crate::logger::disable_logging();
    }

    if cli.quiet {
        ui::set_quiet_mode(true);
    }

    if let Some(command) = cli.command {
        handle_command(command).await
    } else {
        // If no subcommand is provided, print the help
        let _ = Cli::parse_from(["git-quill", "--help"]);
        Ok(())
    }
}

pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Gen {
            path,
            print,
            select,
            fast_only,
        } => {
            log_debug!(
                "Handling 'gen' command with path: {:?}, print: {}, select: {:?}, fast_only: {}",
                path,
                print,
                select,
                fast_only
            );
            commit::handle_gen_command(GenOptions {
                path,
                print,
                select,
                fast_only,
            })
            .await
        }
        Commands::Inspect { path } => {
            log_debug!("Handling 'inspect' command with path: {:?}", path);
            commit::handle_inspect_command(path)
        }
        Commands::Config {
            backend,
            tier,
            endpoint,
            model,
            api_key,
            api_key_env,
        } => handle_config_command(BackendUpdate {
            backend,
            tier,
            endpoint,
            model,
            api_key,
            api_key_env,
        }),
    }
}

/// Backend fields given on the command line
struct BackendUpdate {
    backend: Option<String>,
    tier: Option<BackendTier>,
    endpoint: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    api_key_env: Option<String>,
}

impl BackendUpdate {
    fn is_empty(&self) -> bool {
        self.tier.is_none()
            && self.endpoint.is_none()
            && self.model.is_none()
            && self.api_key.is_none()
            && self.api_key_env.is_none()
    }

    fn apply(self, id: &str, config: &mut Config) {
        let index = match config.backends.iter().position(|b| b.id == id) {
            Some(index) => index,
            None => {
                let tier = self.tier.unwrap_or_default();
                config.backends.push(BackendConfig::with_defaults(id, tier));
                config.backends.len() - 1
            }
        };
        let backend = &mut config.backends[index];
        if let Some(tier) = self.tier {
            backend.tier = tier;
        }
        if let Some(endpoint) = self.endpoint {
            backend.endpoint = endpoint;
        }
        if let Some(model) = self.model {
            backend.model = model;
        }
        if let Some(api_key) = self.api_key {
            backend.api_key = api_key;
        }
        if let Some(api_key_env) = self.api_key_env {
            backend.api_key_env = api_key_env;
        }
    }
}

fn handle_config_command(update: BackendUpdate) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let root = GitRepo::discover(&cwd).ok().map(|r| r.root().to_path_buf());

    match update.backend.clone() {
        Some(id) if !update.is_empty() => {
            // Edits go to the personal file only, never merged with a project file
            let mut config = Config::load(None)?;
            update.apply(&id, &mut config);
            config.validate()?;
            config.save()?;
            ui::print_success(&format!("Backend '{id}' updated"));
        }
        Some(_) => {
            ui::print_warning("Nothing to change: pass --model, --endpoint, --tier, --api-key or --api-key-env");
        }
        None => {
            let config = Config::load(root.as_deref())?;
            let rendered = toml::to_string_pretty(&config.redacted())?;
            ui::print_info(&format!(
                "Configuration file: {}",
                Config::get_config_path()?.display()
            ));
            ui::print_bordered_content(&rendered);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_arguments() {
        let cli = Cli::parse_from(["git-quill", "gen", "--select", "2", "--fast-only", "-q"]);
        assert!(cli.quiet);
        match cli.command {
            Some(Commands::Gen {
                select, fast_only, print, ..
            }) => {
                assert_eq!(select, Some(2));
                assert!(fast_only);
                assert!(!print);
            }
            _ => panic!("expected gen"),
        }
    }

    #[test]
    fn test_backend_update_adds_new_backend() {
        let mut config = Config::default();
        BackendUpdate {
            backend: Some("local".to_string()),
            tier: Some(BackendTier::Deep),
            endpoint: Some("http://localhost:11434/v1/chat/completions".to_string()),
            model: Some("llama3".to_string()),
            api_key: None,
            api_key_env: None,
        }
        .apply("local", &mut config);

        let local = config.backends.last().expect("backend");
        assert_eq!(local.id, "local");
        assert_eq!(local.tier, BackendTier::Deep);
        assert_eq!(local.model, "llama3");
        assert!(config.validate().is_ok());
    }
}
