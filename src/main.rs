//! Reads pointer commands from stdin and replays them through a wlroots
//! virtual pointer.

use std::{io, process::ExitCode};

use tracing_subscriber::EnvFilter;
use wlr_vpointer::{Connection, Dispatcher, Error, Session};

fn run() -> Result<(), Error> {
    let connection = Connection::connect_to_env()?;
    let session = Session::establish(connection)?;
    eprintln!("Virtual pointer created");

    let count = Dispatcher::new(&session).run(io::stdin().lock())?;
    tracing::info!(count, "end of input");
    Ok(())
}

fn main() -> ExitCode {
    // Initialize logging from RUST_LOG env var, default to warn
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
