//! Restore completion waits.

use crate::cli::{OutputFormat, RestoreStatusArgs, WaitRestoresArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_restore_status, render_restore_wait};

pub(crate) async fn handle_wait_restores(
    ctx: &AppContext,
    args: &WaitRestoresArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let restore = non_empty("restore name", &args.restore)?;
    let completed = ctx.deps.restore_waiter().wait_for_restores(restore).await?;
    render_restore_wait(restore, completed, format)
}

pub(crate) async fn handle_restore_status(
    ctx: &AppContext,
    args: &RestoreStatusArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let restore = non_empty("restore name", &args.restore)?;
    let volume = non_empty("volume name", &args.volume)?;
    let request = ctx
        .deps
        .restore_waiter()
        .wait_for_restore_status_data(restore, volume)
        .await?;
    render_restore_status(restore, volume, request.as_ref(), format)
}

fn non_empty<'a>(what: &str, value: &'a str) -> CliResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CliError::validation(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}
