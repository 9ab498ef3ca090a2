use std::io::Read as _;
use std::path::PathBuf;

use anyhow::Context as _;
use authsignal::{Client, ClientConfig, UserRequest};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Command-line access to the Authsignal API and webhook signatures.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file; environment variables are used when omitted
    #[arg(short = 'f', long, env = "AUTHSIGNAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a webhook delivery and print its event
    VerifyWebhook {
        /// File containing the raw request body, or `-` for stdin
        #[arg(long)]
        payload: String,
        /// Value of the x-signature-v2 header
        #[arg(long)]
        signature: String,
        /// Tolerance in minutes; 0 or less disables the timestamp check
        #[arg(long, allow_negative_numbers = true)]
        tolerance: Option<i64>,
    },
    /// Print a signature header for a payload, for testing webhook receivers
    SignWebhook {
        /// File containing the request body, or `-` for stdin
        #[arg(long)]
        payload: String,
        /// Unix timestamp to sign; defaults to now
        #[arg(long)]
        timestamp: Option<i64>,
    },
    /// Fetch a user
    GetUser {
        #[arg(long)]
        user_id: String,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Stdout carries command output
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_payload(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .context("Failed to read payload from stdin")?;
        Ok(payload)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read payload from {source}"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing();
    tracing::debug!("{:?}", args);

    let config = ClientConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let client = Client::new(config)?;

    match args.command {
        Command::VerifyWebhook {
            payload,
            signature,
            tolerance,
        } => {
            let payload = read_payload(&payload)?;
            let event = match tolerance {
                Some(tolerance) => client.webhook().construct_event(&payload, &signature, Some(tolerance))?,
                None => client.verify_webhook(&payload, &signature)?,
            };
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        Command::SignWebhook { payload, timestamp } => {
            let payload = read_payload(&payload)?;
            let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());
            println!("{}", client.webhook().sign(&payload, timestamp));
        }
        Command::GetUser { user_id } => {
            let user = client.get_user(UserRequest { user_id }).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
    }

    Ok(())
}
