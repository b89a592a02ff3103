use crate::cli::OutputFormat;
use crate::client::{AppContext, CliResult};
use crate::output::render_plugins;

pub(crate) fn handle_plugins(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    render_plugins(&ctx.registry.descriptors(), format)
}
