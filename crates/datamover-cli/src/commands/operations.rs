//! Progress and cancellation of operations addressed by handle.

use anyhow::anyhow;
use datamover_coordinator::actions::{DATAMOVER_RESTORER, SNAPSHOT_CONTENT_BACKUPPER};
use datamover_coordinator::{BackupContext, RestoreContext};
use datamover_core::TransferKind;
use tracing::info;

use crate::cli::{CancelArgs, KindArg, OutputFormat, ProgressArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_progress;

pub(crate) async fn handle_progress(
    ctx: &AppContext,
    args: &ProgressArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let handle = args.handle.trim();
    let progress = ctx
        .deps
        .progress_reporter()
        .progress(TransferKind::from(args.kind), handle)
        .await?;
    render_progress(handle, &progress, format)
}

pub(crate) async fn handle_cancel(ctx: &AppContext, args: CancelArgs) -> CliResult<()> {
    let handle = args.handle.trim();
    if handle.is_empty() {
        return Err(CliError::validation("operation handle must not be empty"));
    }

    match args.kind {
        KindArg::Backup => {
            let action = ctx
                .registry
                .backup_action(SNAPSHOT_CONTENT_BACKUPPER)
                .ok_or_else(|| missing_action(SNAPSHOT_CONTENT_BACKUPPER))?;
            let backup = BackupContext {
                name: args.operation,
                namespace: ctx.deps.config.protected_namespace.clone(),
                storage_location: args.storage_location,
            };
            action.cancel(handle, &backup).await?;
        }
        KindArg::Restore => {
            let action = ctx
                .registry
                .restore_action(DATAMOVER_RESTORER)
                .ok_or_else(|| missing_action(DATAMOVER_RESTORER))?;
            let restore = RestoreContext {
                name: args.operation,
                ..RestoreContext::default()
            };
            action.cancel(handle, &restore).await?;
        }
    }

    info!(handle, "cancel delivered");
    println!("cancel requested for {handle}");
    Ok(())
}

fn missing_action(name: &str) -> CliError {
    CliError::failure(anyhow!("action {name} is not registered"))
}
