// groupsconnector/src/console/actions.rs
use regex::Regex;
use std::io::{self, BufRead, Write};
use std::sync::LazyLock;

use super::{Console, Services, Session};
use crate::config::SchemaPollConfig;
use crate::errors::AppError;
use crate::graph::models::ExternalConnection;
use crate::graph::schema::{groups_schema, register_schema_and_wait};
use crate::graph::{GroupDirectory, IndexClient};
use crate::store::WatermarkStore;
use crate::sync::{ItemAction, SyncMode, perform_sync_pass};

static CONNECTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{3,32}$").expect("connection id pattern is valid"));

const NO_CONNECTION: &str =
    "No connection selected. Please create a new connection or select an existing connection.";

fn report_remote_error<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    action: &str,
    error: &AppError,
) -> io::Result<()> {
    tracing::error!(action, status = ?error.status(), error = %error, "remote call failed");
    match error {
        AppError::Service { status, code, message } => {
            console.error(format!("{} error {}:", status.as_u16(), action))?;
            console.error(format!("{}: {}", code, message))
        }
        other => {
            console.error(format!("Error {}:", action))?;
            console.error(other)
        }
    }
}

fn current_connection<'s, R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &'s Session,
) -> io::Result<Option<&'s ExternalConnection>> {
    match session.connection.as_ref() {
        Some(connection) => Ok(Some(connection)),
        None => {
            console.warning(NO_CONNECTION)?;
            Ok(None)
        }
    }
}

fn prompt_connection_id<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
) -> io::Result<Option<String>> {
    loop {
        let Some(id) = console.prompt("Enter a unique ID for the new connection", true)? else {
            return Ok(None);
        };
        if CONNECTION_ID.is_match(&id) {
            return Ok(Some(id));
        }
        console.error("Connection IDs must be 3 to 32 letters or digits")?;
    }
}

pub async fn create_connection<R, W, I>(
    console: &mut Console<R, W>,
    session: &mut Session,
    index: &I,
) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    I: IndexClient + ?Sized,
{
    let Some(id) = prompt_connection_id(console)? else {
        return Ok(());
    };
    let Some(name) = console.prompt("Enter a name for the new connection", true)? else {
        return Ok(());
    };
    let description = console
        .prompt("Enter a description for the new connection", false)?
        .filter(|d| !d.is_empty());

    match index.create_connection(&id, &name, description.as_deref()).await {
        Ok(connection) => {
            console.success("New connection created")?;
            console.line(serde_json::to_string_pretty(&connection).unwrap_or_default())?;
            session.connection = Some(connection);
            Ok(())
        }
        Err(e) => report_remote_error(console, "creating new connection", &e),
    }
}

pub async fn select_existing_connection<R, W, I>(
    console: &mut Console<R, W>,
    session: &mut Session,
    index: &I,
) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    I: IndexClient + ?Sized,
{
    console.line("Getting existing connections...")?;
    let connections = match index.list_connections().await {
        Ok(connections) => connections,
        Err(e) => return report_remote_error(console, "getting connections", &e),
    };

    if connections.is_empty() {
        console.warning("No connections exist. Please create a new connection.")?;
        return Ok(());
    }

    console.line("Choose one of the following connections:")?;
    for (number, connection) in connections.iter().enumerate() {
        console.line(format!("{}. {}", number + 1, connection.name))?;
    }

    loop {
        console.inline("Selection: ")?;
        let Some(input) = console.read_line()? else {
            return Ok(());
        };
        match input.trim().parse::<usize>() {
            Ok(choice) if (1..=connections.len()).contains(&choice) => {
                let selected = connections[choice - 1].clone();
                tracing::info!(connection_id = %selected.id, "connection selected");
                session.connection = Some(selected);
                return Ok(());
            }
            _ => console.warning("Invalid choice.")?,
        }
    }
}

pub async fn delete_current_connection<R, W, I>(
    console: &mut Console<R, W>,
    session: &mut Session,
    index: &I,
) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    I: IndexClient + ?Sized,
{
    let Some(connection) = current_connection(console, session)?.cloned() else {
        return Ok(());
    };

    console.warning(format!("Deleting {} - THIS CANNOT BE UNDONE", connection.name))?;
    console.warning("Enter the connection name to confirm.")?;
    let confirmation = console.read_line()?.unwrap_or_default();
    if confirmation.trim() != connection.name {
        console.warning("Canceled")?;
        return Ok(());
    }

    match index.delete_connection(&connection.id).await {
        Ok(()) => {
            console.success(format!("{} deleted", connection.name))?;
            session.connection = None;
            Ok(())
        }
        Err(e) => report_remote_error(console, "deleting connection", &e),
    }
}

pub async fn register_schema<R, W, I>(
    console: &mut Console<R, W>,
    session: &Session,
    index: &I,
    poll: SchemaPollConfig,
) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    I: IndexClient + ?Sized,
{
    let Some(connection) = current_connection(console, session)? else {
        return Ok(());
    };

    console.line("Registering schema, this may take a moment...")?;
    match register_schema_and_wait(index, &connection.id, &groups_schema(), poll).await {
        Ok(_) => console.success("Schema registered"),
        Err(AppError::SchemaTimeout { attempts }) => console.error(format!(
            "Schema registration is still running after {} status checks. Check again later with 'View schema'.",
            attempts
        )),
        Err(e) => report_remote_error(console, "registering schema", &e),
    }
}

pub async fn view_schema<R, W, I>(
    console: &mut Console<R, W>,
    session: &Session,
    index: &I,
) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    I: IndexClient + ?Sized,
{
    let Some(connection) = current_connection(console, session)? else {
        return Ok(());
    };

    match index.get_schema(&connection.id).await {
        Ok(schema) => console.line(serde_json::to_string_pretty(&schema).unwrap_or_default()),
        Err(e) => report_remote_error(console, "getting schema", &e),
    }
}

pub async fn push_items<R, Wr, I, D, W>(
    console: &mut Console<R, Wr>,
    session: &Session,
    services: &Services<'_, I, D, W>,
    mode: SyncMode,
) -> io::Result<()>
where
    R: BufRead,
    Wr: Write,
    I: IndexClient + ?Sized,
    D: GroupDirectory + ?Sized,
    W: WatermarkStore + ?Sized,
{
    let Some(connection) = current_connection(console, session)? else {
        return Ok(());
    };

    let result = perform_sync_pass(
        services.index,
        services.directory,
        services.store,
        services.watermarks,
        &connection.id,
        mode,
    )
    .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = ?e, "sync pass aborted");
            console.error("Sync aborted:")?;
            return console.error(format!("{:#}", e));
        }
    };

    let directory = &report.reconcile;
    console.line(format!(
        "Directory snapshot: {} new, {} changed, {} removed, {} unchanged",
        directory.added, directory.updated, directory.deleted, directory.unchanged
    ))?;
    if mode == SyncMode::Incremental {
        match report.previous_watermark {
            Some(watermark) => console.line(format!(
                "Uploaded changes since last upload at {}",
                watermark.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
            ))?,
            None => console.line("No previous upload recorded, uploaded every group")?,
        }
    }
    console.line(format!(
        "Processed {} add/updates, {} deletes",
        report.planned_upserts, report.planned_deletes
    ))?;
    if report.already_absent > 0 {
        console.warning(format!(
            "{} item(s) were already absent from the index",
            report.already_absent
        ))?;
    }
    for failure in &report.failures {
        let verb = match failure.action {
            ItemAction::Upsert => "adding or updating",
            ItemAction::Delete => "deleting",
        };
        console.error(format!("Error {} group {}: {}", verb, failure.id, failure.error))?;
    }

    if report.watermark_advanced {
        console.success(format!(
            "{} uploaded, {} deleted",
            report.upserted,
            report.deleted + report.already_absent
        ))?;
        console.line(format!(
            "Last upload time set to {}",
            report.started_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        ))
    } else {
        console.warning(format!(
            "{} item(s) failed; last upload time left unchanged so the next run retries them",
            report.failures.len()
        ))
    }
}
