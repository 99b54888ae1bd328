// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Smoke tool for poking a NATS server through the connector
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nats_connector::{Connector, Payload};
use natsbridge_config::AppConfig;
use natsbridge_logging::{try_init, LogFormat};
use std::time::Duration;
use tokio::signal;
use tracing::info;

#[derive(Parser)]
#[command(name = "natsbridge-probe")]
#[command(about = "Publish, request, or subscribe against a NATS server")]
#[command(version)]
struct Cli {
    /// Override NATS_HOST
    #[arg(long, value_name = "HOST")]
    server: Option<String>,

    /// Override NATS_PORT
    #[arg(long, value_name = "PORT")]
    port: Option<String>,

    /// Request timeout in milliseconds; overrides NATS_REQUEST_TIMEOUT_MS
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Log output format (console or json)
    #[arg(long, default_value = "console")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish a payload; valid JSON is sent as JSON, anything else as text
    Publish { subject: String, payload: String },
    /// Send a request and print the reply body
    Request { subject: String, payload: String },
    /// Print every message received until Ctrl+C
    Subscribe { subject: String },
}

fn parse_payload(raw: String) -> Payload {
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) if value.is_object() || value.is_array() => Payload::Json(value),
        _ => Payload::Text(raw),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    try_init("natsbridge-probe", config.log_level(), cli.log_format)?;

    let connector = Connector::new(config.nats);
    connector.set_enabled(true);
    if let Some(timeout_ms) = cli.timeout_ms {
        connector.set_request_timeout(Some(Duration::from_millis(timeout_ms)));
    }
    if let Some(server) = cli.server {
        connector.set_server(server);
    }
    if let Some(port) = cli.port {
        connector.set_port(port);
    }

    info!(
        host = %connector.config().host,
        port = %connector.config().port,
        "Configuration loaded"
    );

    match cli.command {
        Command::Publish { subject, payload } => {
            connector.publish(&subject, parse_payload(payload)).await?;
            connector.flush().await?;
            info!(subject = %subject, "Message published");
        }
        Command::Request { subject, payload } => {
            let body = connector.request(&subject, payload).await?;
            println!("{}", body);
        }
        Command::Subscribe { subject } => {
            let handle = connector
                .subscribe(&subject, |msg| {
                    println!("[{}] {}", msg.subject, msg.body());
                })
                .await?;

            info!(subject = %subject, "Listening. Press Ctrl+C to stop.");
            signal::ctrl_c().await.context("Unable to listen for shutdown signal")?;
            handle.unsubscribe().await;
        }
    }

    Ok(())
}
