use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Verify => commands::verify::handle(ctx, flags),
        Commands::Append(args) => commands::append::handle(&args, ctx, flags),
        Commands::List(args) => commands::list::handle(&args, ctx, flags),
        Commands::Users => commands::users::handle(ctx, flags),
        Commands::Show(args) => commands::show::handle(&args, ctx, flags),
        Commands::Explain(args) => commands::explain::handle(&args, ctx, flags),
        Commands::Schema(_) => {
            unreachable!("schema is pre-dispatched in main")
        }
    }
}
