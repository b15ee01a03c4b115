//! Interactive mode: many commands, one session, one cache.

use super::{print_value, render_error, run_command, Commands};
use crate::core::error::ClientError;
use crate::outlook::OutlookClient;
use clap::Parser;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "outlookctl", no_binary_name = true)]
struct ReplLine {
    #[command(subcommand)]
    command: Commands,
}

/// Reads one command per line from stdin and dispatches it against the
/// shared client. `exit`, `quit`, or EOF end the loop.
pub async fn run(client: &OutlookClient) -> Result<Option<Value>, ClientError> {
    eprintln!("outlookctl interactive mode; type a command, `exit` to leave");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let Some(tokens) = tokenize(line) else {
            eprintln!("Error: unbalanced quotes");
            continue;
        };

        match ReplLine::try_parse_from(tokens) {
            Ok(parsed) => match run_command(client, parsed.command).await {
                Ok(value) => print_value(&value),
                Err(err) => eprintln!("{}", render_error(&err)),
            },
            Err(err) => eprintln!("{err}"),
        }
    }

    Ok(None)
}

fn tokenize(line: &str) -> Option<Vec<String>> {
    shlex::split(line)
}
