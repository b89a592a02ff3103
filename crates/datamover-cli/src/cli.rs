//! Command-line interface for inspecting data mover operations on a cluster.

use clap::{Args, Parser, Subcommand, ValueEnum};
use datamover_core::TransferKind;

use crate::client::{AppContext, CliResult};
use crate::commands::operations::{handle_cancel, handle_progress};
use crate::commands::plugins::handle_plugins;
use crate::commands::restores::{handle_restore_status, handle_wait_restores};

/// Parses CLI arguments, executes the requested command, and reports failures.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let ctx = match AppContext::from_env(cli.log_format.as_deref()).await {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };

    match dispatch(cli.command, cli.output, &ctx).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

pub(crate) async fn dispatch(
    command: Command,
    output: OutputFormat,
    ctx: &AppContext,
) -> CliResult<()> {
    match command {
        Command::Progress(args) => handle_progress(ctx, &args, output).await,
        Command::Cancel(args) => handle_cancel(ctx, args).await,
        Command::WaitRestores(args) => handle_wait_restores(ctx, &args, output).await,
        Command::RestoreStatus(args) => handle_restore_status(ctx, &args, output).await,
        Command::Plugins => handle_plugins(ctx, output),
    }
}

#[derive(Parser)]
#[command(
    name = "datamover",
    about = "Inspect asynchronous data mover backups and restores"
)]
pub(crate) struct Cli {
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        help = "Log output format (json or pretty); defaults to DATAMOVER_LOG_FORMAT"
    )]
    pub(crate) log_format: Option<String>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Report progress of the operation behind a handle.
    Progress(ProgressArgs),
    /// Ask the owning action to cancel an operation.
    Cancel(CancelArgs),
    /// Wait for every transfer request of a restore to finish.
    WaitRestores(WaitRestoresArgs),
    /// Wait until one volume of a restore has status data.
    RestoreStatus(RestoreStatusArgs),
    /// List registered item actions.
    Plugins,
}

#[derive(Args)]
pub(crate) struct ProgressArgs {
    #[arg(long, value_enum, default_value_t = KindArg::Backup)]
    pub(crate) kind: KindArg,
    /// Operation handle returned by the item action (`namespace/name`).
    pub(crate) handle: String,
}

#[derive(Args)]
pub(crate) struct CancelArgs {
    #[arg(long, value_enum, default_value_t = KindArg::Backup)]
    pub(crate) kind: KindArg,
    /// Name of the backup or restore that started the operation.
    #[arg(long)]
    pub(crate) operation: String,
    #[arg(long, default_value = "default")]
    pub(crate) storage_location: String,
    pub(crate) handle: String,
}

#[derive(Args)]
pub(crate) struct WaitRestoresArgs {
    /// Restore name.
    pub(crate) restore: String,
}

#[derive(Args)]
pub(crate) struct RestoreStatusArgs {
    /// Restore name.
    pub(crate) restore: String,
    /// Source volume name recorded on the backup.
    pub(crate) volume: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum KindArg {
    Backup,
    Restore,
}

impl From<KindArg> for TransferKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Backup => Self::Backup,
            KindArg::Restore => Self::Restore,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn progress_defaults_to_backups_and_tables() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["datamover", "progress", "openshift-adp/vsb-x2k"])?;
        assert_eq!(cli.output, OutputFormat::Table);
        match cli.command {
            Command::Progress(args) => {
                assert_eq!(args.kind, KindArg::Backup);
                assert_eq!(args.handle, "openshift-adp/vsb-x2k");
            }
            _ => panic!("expected progress"),
        }
        Ok(())
    }

    #[test]
    fn output_is_global_and_accepts_the_format_alias() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "datamover",
            "restore-status",
            "nightly-restore",
            "db",
            "--format",
            "json",
        ])?;
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Command::RestoreStatus(ref args) if args.volume == "db"));
        Ok(())
    }

    #[test]
    fn cancel_requires_the_owning_operation() {
        assert!(Cli::try_parse_from(["datamover", "cancel", "apps/vsr-1"]).is_err());
        let parsed = Cli::try_parse_from([
            "datamover",
            "cancel",
            "--kind",
            "restore",
            "--operation",
            "nightly-restore",
            "apps/vsr-1",
        ]);
        assert!(matches!(
            parsed.map(|cli| cli.command),
            Ok(Command::Cancel(CancelArgs { kind: KindArg::Restore, .. }))
        ));
    }

    #[test]
    fn kinds_map_onto_transfer_kinds() {
        assert_eq!(TransferKind::from(KindArg::Backup), TransferKind::Backup);
        assert_eq!(TransferKind::from(KindArg::Restore), TransferKind::Restore);
    }
}
