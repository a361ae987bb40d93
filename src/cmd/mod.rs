//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`validate`], or [`health`]. Each
//! handler lives in its own submodule.

pub mod health;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::PurgecastError;

pub async fn dispatch(cli: Cli) -> Result<(), PurgecastError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args),
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  purgecast v{version} \u{2014} cache invalidation broadcaster\n\n  \
         No command provided. To get started:\n\n    \
         purgecast run -e endpoints.yaml      Broadcast to the endpoints in a file\n    \
         purgecast run --endpoint host:port   Broadcast to fixed endpoints\n    \
         purgecast validate endpoints.yaml    Check an endpoints file\n    \
         purgecast --help                     See all commands and options\n"
    );
}
