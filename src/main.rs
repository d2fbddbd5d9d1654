//! reviewwatch CLI - homework review status notifications for Telegram.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reviewwatch::{
    Config, Credentials, PollState, Poller, PracticumClient, TelegramNotifier, latest_status,
};
use std::path::PathBuf;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "reviewwatch")]
#[command(version)]
#[command(about = "Relays homework review status changes to a Telegram chat")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults plus environment if omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for status changes and send notifications
    Run {
        /// Initial cursor as Unix seconds (default: now)
        #[arg(long)]
        from_date: Option<i64>,

        /// Seconds between polls (overrides the config file)
        #[arg(long)]
        retry_period: Option<u64>,
    },

    /// Print the newest homework status once, without notifying
    Status {
        /// Only consider homework updated since this Unix time
        #[arg(long, default_value = "0")]
        from_date: i64,
    },

    /// Validate configuration and credentials
    Check,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn print_example_config() {
    let example = r#"# reviewwatch configuration file
# Every key is optional; the values below are the defaults.

[practicum]
endpoint = "https://practicum.yandex.ru/api/user_api/homework_statuses/"
# OAuth token (or set PRACTICUM_TOKEN; ${VAR} placeholders are expanded)
# token = "y0_..."
token_env = "PRACTICUM_TOKEN"
timeout_secs = 30

[telegram]
api_base = "https://api.telegram.org"
# token = "123456:ABC..."
token_env = "TELEGRAM_TOKEN"
# chat_id = "123456789"
chat_id_env = "TELEGRAM_CHAT_ID"
timeout_secs = 30

[polling]
retry_period_secs = 600
"#;
    println!("{example}");
}

/// Resolve credentials, exiting if any of them is missing.
fn load_credentials(config: &Config) -> Credentials {
    let credentials = config.resolve_credentials();
    if !credentials.check_tokens() {
        error!(
            missing = ?credentials.missing(),
            "Required credentials are missing, shutting down"
        );
        std::process::exit(1);
    }
    credentials
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Commands::Example = cli.command {
        print_example_config();
        return Ok(());
    }

    // A missing .env is fine: the environment may already be populated.
    let _ = dotenvy::dotenv();

    let mut config = Config::load(cli.config.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    match cli.command {
        Commands::Example => {}

        Commands::Check => {
            let credentials = config.resolve_credentials();
            let missing = credentials.missing();
            if !missing.is_empty() {
                anyhow::bail!("Missing credentials: {}", missing.join(", "));
            }

            info!("Configuration is valid");
            info!("  Endpoint: {}", config.practicum.endpoint);
            info!("  Chat: {}", credentials.telegram_chat_id);
            info!("  Retry period: {}s", config.polling.retry_period_secs);
        }

        Commands::Status { from_date } => {
            let credentials = load_credentials(&config);
            let client = PracticumClient::new(
                &credentials.practicum_token,
                config.practicum.endpoint.clone(),
                Some(config.practicum.timeout_secs),
            )?;

            match latest_status(&client, from_date).await {
                Ok(message) => println!("{message}"),
                Err(e) if e.is_informational() => println!("No homework since {from_date}"),
                Err(e) => return Err(e).context("Failed to fetch homework status"),
            }
        }

        Commands::Run {
            from_date,
            retry_period,
        } => {
            if let Some(secs) = retry_period {
                config.polling.retry_period_secs = secs;
            }
            let credentials = load_credentials(&config);

            let client = PracticumClient::new(
                &credentials.practicum_token,
                config.practicum.endpoint.clone(),
                Some(config.practicum.timeout_secs),
            )?;
            let notifier = TelegramNotifier::new(
                credentials.telegram_token,
                credentials.telegram_chat_id,
                config.telegram.api_base.clone(),
                Some(config.telegram.timeout_secs),
            )?;

            let state = match from_date {
                Some(cursor) => PollState::new(cursor),
                None => PollState::starting_now(),
            };

            info!(
                endpoint = client.endpoint(),
                chat_id = notifier.chat_id(),
                "Clients ready"
            );
            Poller::new(client, notifier, config.retry_period())
                .run(state)
                .await;
        }
    }

    Ok(())
}
