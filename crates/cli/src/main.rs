//! Headless host for the call notification client
//!
//! Connects to the event stream as the given operator, logs every panel
//! transition and reads operator commands from stdin:
//!
//! ```text
//! call <number>     place an outbound call
//! open user|ticket  follow a link on the call panel
//! ok                dismiss the current error
//! activate          simulate the panel regaining focus
//! quit
//! ```

mod logging;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use callnotify_core::{HostContext, HostEvent, HttpDirectory, NotifyClient, NotifyConfig, RecordKind};

use crate::logging::{parse_log_level, setup_logging, LoggingConfig};
use crate::shell::LogShell;

#[derive(Parser, Debug)]
#[command(name = "callnotify", version, about = "Real-time call notifications for helpdesk operators")]
struct Cli {
    /// Helpdesk user id of the operator
    #[arg(long, env = "CALLNOTIFY_OPERATOR")]
    user: String,

    /// Helpdesk account subdomain
    #[arg(long, env = "CALLNOTIFY_ACCOUNT")]
    subdomain: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log as JSON lines
    #[arg(long)]
    json: bool,

    /// Include source file and line in log records
    #[arg(long)]
    log_location: bool,
}

#[derive(Debug, PartialEq)]
enum Command {
    Host(HostEvent),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match (words.next()?, words.next()) {
        ("call", Some(first)) => {
            let number: String = std::iter::once(first).chain(words).collect();
            Command::Host(HostEvent::DialOut(number))
        }
        ("open", Some("user")) => Command::Host(HostEvent::Navigate(RecordKind::User)),
        ("open", Some("ticket")) => Command::Host(HostEvent::Navigate(RecordKind::Ticket)),
        ("ok", None) => Command::Host(HostEvent::ErrorDismissed),
        ("activate", None) => Command::Host(HostEvent::PaneActivated),
        ("quit", None) | ("exit", None) => Command::Quit,
        _ => return None,
    };
    Some(command)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::new(parse_log_level(&cli.log_level)?);
    if cli.json {
        logging = logging.with_json();
    }
    if cli.log_location {
        logging = logging.with_file_info();
    }
    setup_logging(logging)?;

    let config = NotifyConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let context = HostContext {
        current_user_id: cli.user,
        account_subdomain: cli.subdomain,
    };

    let directory = HttpDirectory::from_config(&config.directory, &context)?;
    let shell = LogShell::new(Some(directory.base_url().to_string()));
    let (client, link_events) =
        NotifyClient::connect(&config, &context, Arc::new(directory), Arc::new(shell))?;

    let (host_tx, host_rx) = mpsc::channel(16);
    let client_task = tokio::spawn(client.run(link_events, host_rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => match parse_command(&line) {
                    Some(Command::Host(event)) => {
                        if host_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Some(Command::Quit) => break,
                    None => warn!(input = %line, "unknown command"),
                },
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("shutting down");
    drop(host_tx);
    client_task.await.context("notification client task")?;
    Ok(())
}
