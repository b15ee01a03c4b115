//! Command-line interface parsing and dispatch.
//!
//! One subcommand per façade operation; results print to stdout (raw
//! text for plain-string results, pretty JSON otherwise) and failures
//! become a single stderr line plus a non-zero exit. Logs go to stderr
//! so stdout stays machine-readable.

pub mod repl;

use crate::core::config::Config;
use crate::core::error::ClientError;
use crate::outlook::calendar::{EventDraft, EventPatch};
use crate::outlook::mail::MailDraft;
use crate::outlook::OutlookClient;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fixed prefix for authentication failures so calling automation can
/// match the condition without parsing the message.
pub const AUTH_REQUIRED_MARKER: &str = "AUTH_REQUIRED:";

#[derive(Parser)]
#[command(name = "outlookctl", version)]
#[command(about = "Outlook/Microsoft 365 from the command line, via an MCP tool server")]
#[command(
    long_about = "outlookctl talks to an MCP tool server (which fronts the Microsoft Graph \
API) to read and write Outlook mail, calendars, contacts, and tasks.\n\n\
Configuration:\n\
  A TOML file with a [server] section describing how to launch the MCP \
server process (command, args, env). The default location follows the \
platform config directory; use --config to point elsewhere.\n\n\
Authentication:\n\
  The server owns tokens and their refresh. When it reports an \
unauthenticated session, commands fail with an `AUTH_REQUIRED:` prefix; \
run `outlookctl login` and retry.\n\n\
Caching:\n\
  Read results are cached in-process with per-operation lifetimes and \
invalidated by writes. `outlookctl repl` keeps one session and cache \
alive across commands; --no-cache bypasses the cache for an invocation.\n\n\
Logging:\n\
  Set RUST_LOG (e.g. RUST_LOG=outlookctl=debug) to see wire-level detail \
on stderr."
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bypass the result cache for this invocation
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive sign-in flow
    Login,
    /// Report the current authentication status
    VerifyLogin,

    /// List recent messages
    ListMessages {
        /// Well-known or custom folder name (defaults to the inbox)
        #[arg(long)]
        folder: Option<String>,
        /// Maximum number of messages to return
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
        top: Option<u32>,
    },
    /// List mail folders
    ListFolders,
    /// List messages in a specific folder
    ListFolderMessages {
        /// Folder id
        folder_id: String,
        /// Maximum number of messages to return
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
        top: Option<u32>,
    },
    /// Show one message
    GetMessage {
        /// Message id
        message_id: String,
    },
    /// Send a message
    SendMail {
        /// One or more recipient addresses
        #[arg(required = true)]
        to: Vec<String>,
        /// Subject line
        #[arg(long)]
        subject: String,
        /// Body text
        #[arg(long)]
        body: String,
        /// Cc recipients
        #[arg(long)]
        cc: Vec<String>,
        /// Bcc recipients
        #[arg(long)]
        bcc: Vec<String>,
        /// Treat the body as HTML instead of plain text
        #[arg(long)]
        html: bool,
    },
    /// Create a draft without sending it
    CreateDraft {
        /// One or more recipient addresses
        #[arg(required = true)]
        to: Vec<String>,
        /// Subject line
        #[arg(long)]
        subject: String,
        /// Body text
        #[arg(long)]
        body: String,
        /// Cc recipients
        #[arg(long)]
        cc: Vec<String>,
        /// Bcc recipients
        #[arg(long)]
        bcc: Vec<String>,
        /// Treat the body as HTML instead of plain text
        #[arg(long)]
        html: bool,
    },
    /// Move a message to another folder
    MoveMessage {
        /// Message id
        message_id: String,
        /// Destination folder id
        destination_folder_id: String,
    },
    /// Delete a message
    DeleteMessage {
        /// Message id
        message_id: String,
    },

    /// List calendars
    ListCalendars,
    /// List upcoming events
    ListEvents {
        /// Calendar name or id (defaults to the primary calendar)
        #[arg(long)]
        calendar: Option<String>,
        /// Maximum number of events to return
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
        top: Option<u32>,
    },
    /// Show one event
    GetEvent {
        /// Event id
        event_id: String,
    },
    /// List events overlapping a time range
    GetCalendarView {
        /// Range start (RFC 3339)
        #[arg(long)]
        start: String,
        /// Range end (RFC 3339)
        #[arg(long)]
        end: String,
        /// Calendar name or id (defaults to the primary calendar)
        #[arg(long)]
        calendar: Option<String>,
    },
    /// Create an event
    CreateEvent {
        /// Subject line
        #[arg(long)]
        subject: String,
        /// Event start (RFC 3339)
        #[arg(long)]
        start: String,
        /// Event end (RFC 3339)
        #[arg(long)]
        end: String,
        /// Location text
        #[arg(long)]
        location: Option<String>,
        /// Body text
        #[arg(long)]
        body: Option<String>,
        /// Attendee addresses
        #[arg(long)]
        attendee: Vec<String>,
        /// Calendar name or id (defaults to the primary calendar)
        #[arg(long)]
        calendar: Option<String>,
    },
    /// Update fields of an event
    UpdateEvent {
        /// Event id
        event_id: String,
        /// New subject line
        #[arg(long)]
        subject: Option<String>,
        /// New start (RFC 3339)
        #[arg(long)]
        start: Option<String>,
        /// New end (RFC 3339)
        #[arg(long)]
        end: Option<String>,
        /// New location text
        #[arg(long)]
        location: Option<String>,
        /// New body text
        #[arg(long)]
        body: Option<String>,
    },
    /// Delete an event
    DeleteEvent {
        /// Event id
        event_id: String,
    },

    /// List contacts
    ListContacts {
        /// Maximum number of contacts to return
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
        top: Option<u32>,
    },
    /// List To Do tasks
    ListTasks {
        /// Task list id (defaults to the default list)
        #[arg(long)]
        list_id: Option<String>,
        /// Maximum number of tasks to return
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
        top: Option<u32>,
    },
    /// Search across the mailbox
    Search {
        /// Search query
        query: String,
        /// Maximum number of results to return
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
        top: Option<u32>,
    },

    /// Inspect or control the result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Run commands interactively against one persistent session
    Repl,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show hit/miss counters and the live entry count
    Stats,
    /// Drop every cached entry
    Clear,
    /// Re-enable caching (interactive mode)
    Enable,
    /// Disable caching (interactive mode)
    Disable,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", render_error(&err));
            std::process::exit(1);
        }
    };

    let client = OutlookClient::new(&config);
    if cli.no_cache {
        client.set_cache_bypass(true);
    }

    let result = match cli.command {
        Commands::Repl => repl::run(&client).await,
        command => run_command(&client, command).await.map(Some),
    };

    client.disconnect().await;

    match result {
        Ok(Some(value)) => print_value(&value),
        Ok(None) => {}
        Err(err) => {
            eprintln!("{}", render_error(&err));
            std::process::exit(1);
        }
    }
    Ok(())
}

pub(crate) async fn run_command(
    client: &OutlookClient,
    command: Commands,
) -> Result<Value, ClientError> {
    match command {
        Commands::Login => client.login().await,
        Commands::VerifyLogin => client.verify_login().await,

        Commands::ListMessages { folder, top } => {
            client.list_messages(folder.as_deref(), top).await
        }
        Commands::ListFolders => client.list_folders().await,
        Commands::ListFolderMessages { folder_id, top } => {
            client.list_folder_messages(&folder_id, top).await
        }
        Commands::GetMessage { message_id } => client.get_message(&message_id).await,
        Commands::SendMail {
            to,
            subject,
            body,
            cc,
            bcc,
            html,
        } => {
            client
                .send_mail(MailDraft {
                    to,
                    cc,
                    bcc,
                    subject,
                    body,
                    html,
                })
                .await
        }
        Commands::CreateDraft {
            to,
            subject,
            body,
            cc,
            bcc,
            html,
        } => {
            client
                .create_draft(MailDraft {
                    to,
                    cc,
                    bcc,
                    subject,
                    body,
                    html,
                })
                .await
        }
        Commands::MoveMessage {
            message_id,
            destination_folder_id,
        } => {
            client
                .move_message(&message_id, &destination_folder_id)
                .await
        }
        Commands::DeleteMessage { message_id } => client.delete_message(&message_id).await,

        Commands::ListCalendars => client.list_calendars().await,
        Commands::ListEvents { calendar, top } => {
            client.list_events(calendar.as_deref(), top).await
        }
        Commands::GetEvent { event_id } => client.get_event(&event_id).await,
        Commands::GetCalendarView {
            start,
            end,
            calendar,
        } => {
            client
                .get_calendar_view(&start, &end, calendar.as_deref())
                .await
        }
        Commands::CreateEvent {
            subject,
            start,
            end,
            location,
            body,
            attendee,
            calendar,
        } => {
            client
                .create_event(EventDraft {
                    subject,
                    start,
                    end,
                    location,
                    body,
                    attendees: attendee,
                    calendar,
                })
                .await
        }
        Commands::UpdateEvent {
            event_id,
            subject,
            start,
            end,
            location,
            body,
        } => {
            client
                .update_event(
                    &event_id,
                    EventPatch {
                        subject,
                        start,
                        end,
                        location,
                        body,
                    },
                )
                .await
        }
        Commands::DeleteEvent { event_id } => client.delete_event(&event_id).await,

        Commands::ListContacts { top } => client.list_contacts(top).await,
        Commands::ListTasks { list_id, top } => {
            client.list_tasks(list_id.as_deref(), top).await
        }
        Commands::Search { query, top } => client.search(&query, top).await,

        Commands::Cache { command } => run_cache_command(client, command).await,
        Commands::Repl => Err(ClientError::InvalidInput(
            "already running interactively".to_string(),
        )),
    }
}

async fn run_cache_command(
    client: &OutlookClient,
    command: CacheCommands,
) -> Result<Value, ClientError> {
    match command {
        CacheCommands::Stats => serde_json::to_value(client.cache_stats().await)
            .map_err(|err| ClientError::Transport(err.to_string())),
        CacheCommands::Clear => Ok(json!({"cleared": client.cache_clear().await})),
        CacheCommands::Enable => {
            client.set_cache_enabled(true);
            Ok(Value::String("cache enabled".to_string()))
        }
        CacheCommands::Disable => {
            client.set_cache_enabled(false);
            Ok(Value::String("cache disabled".to_string()))
        }
    }
}

pub(crate) fn print_value(value: &Value) {
    match value {
        Value::String(text) => println!("{text}"),
        other => println!(
            "{}",
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        ),
    }
}

pub(crate) fn render_error(err: &ClientError) -> String {
    match err {
        ClientError::AuthRequired(message) => format!(
            "{AUTH_REQUIRED_MARKER} {message}. Run `outlookctl login` and retry; \
automatic retries cannot succeed."
        ),
        other => format!("Error: {other}"),
    }
}
