// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Terminal-backed operator console.
//!
//! Visible prompts read a line from stdin, so answers can also be piped in.
//! Hidden prompts use a no-echo password field when stdin is a terminal.

use async_trait::async_trait;
use colored::Colorize;
use dialoguer::Password;
use std::io::{self, BufRead, IsTerminal, Write};

use nubo_core::domain::console::{Echo, OperatorConsole};

pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OperatorConsole for TerminalConsole {
    async fn read_line(&mut self, prompt: &str, echo: Echo) -> io::Result<Option<String>> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || read_blocking(&prompt, echo))
            .await
            .map_err(io::Error::other)?
    }

    fn notify(&mut self, message: &str) {
        println!("{}", message.yellow());
    }
}

fn read_blocking(prompt: &str, echo: Echo) -> io::Result<Option<String>> {
    if echo == Echo::Hidden && io::stdin().is_terminal() {
        return Password::new()
            .with_prompt(password_label(prompt))
            .allow_empty_password(true)
            .interact()
            .map(Some)
            .map_err(io::Error::other);
    }

    let mut stdout = io::stdout();
    write!(stdout, "{}", prompt.bold())?;
    stdout.flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// The password widget appends its own `: ` separator.
fn password_label(prompt: &str) -> &str {
    prompt.trim_end().trim_end_matches(':')
}
