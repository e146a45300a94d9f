//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;

mod commands;

#[derive(Parser)]
#[command(name = "armory")]
#[command(version)]
#[command(about = "Armory account dashboard companion CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with username and password, or start Google sign-in
    Login {
        /// Account username (password is read from stdin)
        #[arg(long)]
        username: Option<String>,

        /// Start the Google sign-in flow instead
        #[arg(long)]
        google: bool,
    },

    /// Create an account
    Signup {
        /// Desired username (password is read from stdin)
        #[arg(long)]
        username: String,

        /// Account email
        #[arg(long)]
        email: String,

        /// Captcha token, when the backend requires one
        #[arg(long)]
        captcha: Option<String>,
    },

    /// End the current session
    Logout,

    /// Show the current session status
    Status,

    /// Process an account-link callback URL
    Link {
        /// Full callback URL, including code and state
        url: String,
    },
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        match cli.command {
            Commands::Login { username, google } => commands::auth::login(username, google).await,
            Commands::Signup {
                username,
                email,
                captcha,
            } => commands::auth::signup(&username, &email, captcha.as_deref()).await,
            Commands::Logout => commands::auth::logout().await,
            Commands::Status => commands::auth::status().await,
            Commands::Link { url } => commands::link::process(&url).await,
        }
    })
}
