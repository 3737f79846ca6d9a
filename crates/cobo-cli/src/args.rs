use std::io::{self, IsTerminal, Write};
use std::process::{Command, Stdio};

use anyhow::{Result, bail};
use cobo_core::planner::{Inputs, NeededInput, PromptSurface};
use inquire::validator::ValueRequiredValidator;
use inquire::{InquireError, Select, Text};
use log::debug;

const DEFAULT_PAGER: &str = "less -R";

/// Operation parameters collected after the path, plus any verb flags that
/// landed among them.
#[derive(Debug, Default, PartialEq)]
pub struct ExtraArgs {
    pub params: Inputs,
    pub describe: bool,
    pub list: bool,
}

/// Parse `--key value`, `--key=value` and bare `--flag` (meaning `true`).
pub fn parse_extra_args(tokens: &[String]) -> Result<ExtraArgs> {
    let mut extra = ExtraArgs::default();
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        match token.as_str() {
            "-d" | "--describe" => {
                extra.describe = true;
                continue;
            }
            "-l" | "--list" => {
                extra.list = true;
                continue;
            }
            _ => {}
        }

        let Some(name) = token.strip_prefix("--").filter(|n| !n.is_empty()) else {
            bail!("unexpected argument '{token}'; parameters are passed as --name value");
        };

        let (key, value) = match name.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => match iter.next_if(|next| !next.starts_with("--")) {
                Some(value) => (name.to_string(), value.clone()),
                None => (name.to_string(), "true".to_string()),
            },
        };
        extra.params.insert(key, value);
    }

    Ok(extra)
}

/// Interactive prompt: a pick list when the input enumerates its values,
/// free text that must not be empty otherwise.
pub struct TerminalPrompt;

impl PromptSurface for TerminalPrompt {
    fn ask(&mut self, need: &NeededInput) -> io::Result<String> {
        let answer = if need.choices.is_empty() {
            Text::new(&need.prompt_label())
                .with_validator(ValueRequiredValidator::new("A value is required."))
                .prompt()
                .map(|value| value.trim().to_string())
        } else {
            let message = format!("{} (REQUIRED - {})", need.name, need.description);
            Select::new(&message, need.choices.clone())
                .with_help_message("↑↓ to move, enter to select")
                .prompt()
        };
        answer.map_err(prompt_error)
    }
}

fn prompt_error(err: InquireError) -> io::Error {
    match err {
        InquireError::IO(err) => err,
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            io::Error::new(io::ErrorKind::Interrupted, "input cancelled")
        }
        other => io::Error::other(other),
    }
}

/// Print `text`, through `$PAGER` when stdout is a terminal.
pub fn page(text: &str) -> Result<()> {
    if !io::stdout().is_terminal() {
        print!("{text}");
        return Ok(());
    }

    let pager = std::env::var("PAGER").unwrap_or_else(|_| DEFAULT_PAGER.to_string());
    let mut parts = pager.split_whitespace();
    let Some(program) = parts.next() else {
        print!("{text}");
        return Ok(());
    };

    let child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .spawn();
    let mut child = match child {
        Ok(child) => child,
        Err(err) => {
            debug!("pager '{pager}' unavailable: {err}");
            print!("{text}");
            return Ok(());
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        // The pager may exit before reading everything.
        if let Err(err) = stdin.write_all(text.as_bytes())
            && err.kind() != io::ErrorKind::BrokenPipe
        {
            return Err(err.into());
        }
    }
    child.wait()?;
    Ok(())
}
