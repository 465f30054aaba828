use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use signalr_client::{Client, ClientConfig, ClientError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("connection ended: {0}")]
    Disconnected(ClientError),
    #[error("timed out after {0}s waiting for call result")]
    Timeout(u64),
    #[error("listen needs at least one --hub")]
    MissingHub,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "signalr-cli", about = "Call hub methods or listen for server invocations")]
struct Cli {
    #[arg(long, env = "SIGNALR_SCHEME", default_value = "https")]
    scheme: String,

    #[arg(long, env = "SIGNALR_HOST")]
    host: String,

    /// Hub to subscribe to on connect (repeatable).
    #[arg(long = "hub")]
    hubs: Vec<String>,

    #[arg(long, default_value_t = 15)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Invoke one hub method and print its result.
    Call {
        hub: String,
        method: String,
        #[arg(help = "Arguments as JSON; anything unparseable is sent as a string")]
        args: Vec<String>,
    },
    /// Print server invocations as JSON lines until the connection ends.
    Listen,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;

    match &cli.command {
        Command::Call { hub, method, args } => run_call(&cli, config, hub, method, args).await,
        Command::Listen => run_listen(&cli, config).await,
    }
}

async fn run_call(
    cli: &Cli,
    config: ClientConfig,
    hub: &str,
    method: &str,
    args: &[String],
) -> Result<(), CliError> {
    let hubs = hubs_with(&cli.hubs, hub);
    let client = Client::new(config)?.on_message_error(|reason| tracing::debug!(%reason, "unroutable frame"));
    client.connect(&cli.scheme, &cli.host, &hubs).await?;

    let args = args.iter().map(|raw| parse_arg(raw)).collect();
    let call = tokio::time::timeout(Duration::from_secs(cli.timeout_secs), client.call(hub, method, args));

    tokio::select! {
        ended = client.dispatch() => Err(CliError::Disconnected(ended)),
        result = call => {
            let values = result.map_err(|_| CliError::Timeout(cli.timeout_secs))??;
            print_json(&Value::Array(values))
        }
    }
}

async fn run_listen(cli: &Cli, config: ClientConfig) -> Result<(), CliError> {
    if cli.hubs.is_empty() {
        return Err(CliError::MissingHub);
    }

    let client = Client::new(config)?
        .on_client_method(|hub, method, args| {
            println!("{}", json!({ "hub": hub, "method": method, "args": args }));
        })
        .on_message_error(|reason| tracing::debug!(%reason, "unroutable frame"));
    client.connect(&cli.scheme, &cli.host, &cli.hubs).await?;
    eprintln!("listening on {} ({})", cli.host, cli.hubs.join(", "));

    tokio::select! {
        ended = client.dispatch() => Err(CliError::Disconnected(ended)),
        _ = tokio::signal::ctrl_c() => Ok(()),
    }
}

/// Subscribed hubs plus the call's target hub, without duplicates.
fn hubs_with(hubs: &[String], hub: &str) -> Vec<String> {
    let mut all = hubs.to_vec();
    if !all.iter().any(|h| h == hub) {
        all.push(hub.to_owned());
    }
    all
}

fn parse_arg(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
