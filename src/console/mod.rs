// groupsconnector/src/console/mod.rs
//! Operator menu. Every action gets the session explicitly; nothing global.

pub(crate) mod actions;
pub(crate) mod menu;

use anyhow::{Context, Result};
use std::fmt::Display;
use std::io::{self, BufRead, Write};

use crate::config::SchemaPollConfig;
use crate::graph::models::ExternalConnection;
use crate::graph::{GroupDirectory, IndexClient};
use crate::store::{GroupStore, WatermarkStore};
use menu::{MENU_ENTRIES, MenuChoice};

/// The connection the operator is working on.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub connection: Option<ExternalConnection>,
}

/// Collaborators the menu actions call into.
pub struct Services<'a, I: ?Sized, D: ?Sized, W: ?Sized> {
    pub index: &'a I,
    pub directory: &'a D,
    pub store: &'a GroupStore,
    pub watermarks: &'a W,
    pub schema_poll: SchemaPollConfig,
}

/// Line-oriented console over any reader/writer pair.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn line(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }

    pub fn success(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "✅ {}", text)
    }

    pub fn warning(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "⚠️ {}", text)
    }

    pub fn error(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "❌ {}", text)
    }

    pub fn inline(&mut self, text: impl Display) -> io::Result<()> {
        write!(self.output, "{}", text)?;
        self.output.flush()
    }

    /// `Ok(None)` once input is exhausted. Bytes that are not UTF-8 become
    /// replacement characters, so they read as an invalid answer.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buffer = Vec::new();
        if self.input.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buffer);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Asks until a non-empty answer arrives when `required`; `Ok(None)` on end of input.
    pub fn prompt(&mut self, prompt: &str, required: bool) -> io::Result<Option<String>> {
        loop {
            self.line(format!("{}:", prompt))?;
            let Some(answer) = self.read_line()? else {
                return Ok(None);
            };
            let answer = answer.trim().to_string();
            if required && answer.is_empty() {
                self.error("You must provide a value")?;
                continue;
            }
            return Ok(Some(answer));
        }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

fn show_menu<R: BufRead, W: Write>(console: &mut Console<R, W>, session: &Session) -> io::Result<()> {
    let current = session
        .connection
        .as_ref()
        .map(|c| c.name.as_str())
        .unwrap_or("NONE");
    console.line(format!("Current connection: {}", current))?;
    console.line("Please choose one of the following options:")?;
    for (choice, label) in MENU_ENTRIES {
        console.line(format!("{}. {}", choice.number(), label))?;
    }
    Ok(())
}

/// Runs until the operator picks Exit or input ends.
pub async fn run_menu_loop<R, Wr, I, D, W>(
    console: &mut Console<R, Wr>,
    session: &mut Session,
    services: &Services<'_, I, D, W>,
) -> Result<()>
where
    R: BufRead,
    Wr: Write,
    I: IndexClient + ?Sized,
    D: GroupDirectory + ?Sized,
    W: WatermarkStore + ?Sized,
{
    console.line("Groups Search Connector\n").context("Failed to write to console")?;

    loop {
        show_menu(console, session).context("Failed to write to console")?;
        let choice = match console.read_line().context("Failed to read menu choice")? {
            Some(input) => MenuChoice::parse(&input),
            None => MenuChoice::Exit,
        };
        tracing::debug!(?choice, "menu choice");

        let outcome = match choice {
            MenuChoice::CreateConnection => {
                actions::create_connection(console, session, services.index).await
            }
            MenuChoice::ChooseExistingConnection => {
                actions::select_existing_connection(console, session, services.index).await
            }
            MenuChoice::DeleteConnection => {
                actions::delete_current_connection(console, session, services.index).await
            }
            MenuChoice::RegisterSchema => {
                actions::register_schema(console, session, services.index, services.schema_poll)
                    .await
            }
            MenuChoice::ViewSchema => actions::view_schema(console, session, services.index).await,
            MenuChoice::PushUpdatedItems => {
                actions::push_items(console, session, services, crate::sync::SyncMode::Incremental)
                    .await
            }
            MenuChoice::PushAllItems => {
                actions::push_items(console, session, services, crate::sync::SyncMode::Full).await
            }
            MenuChoice::Exit => {
                console.line("Goodbye...").context("Failed to write to console")?;
                return Ok(());
            }
            MenuChoice::Invalid => console.warning("Invalid choice! Please try again."),
        };
        outcome.context("Console I/O failed")?;
        console.line("").context("Failed to write to console")?;
    }
}
