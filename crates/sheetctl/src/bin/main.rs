use std::io;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use sheetctl::args::Cli;
use sheetstore::SheetStore;
use tokio::runtime::{Builder, Runtime};
use tracing::error;

fn main() {
    let cli = Cli::parse();
    logutil::configure_global_logger(
        logutil::level_from_verbosity(cli.verbose),
        cli.log_mode.into(),
        io::stderr,
    );

    if let Err(err) = run(cli) {
        error!(%err, "command failed");
        eprintln!("ERROR: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let runtime = build_runtime()?;
    runtime.block_on(async move {
        let conn = cli.connection.connect()?;
        let store =
            SheetStore::new(Arc::new(conn)).with_overwrite_input(cli.connection.overwrite_input.into());

        let stdout = io::stdout();
        let mut out = stdout.lock();
        cli.command.run(&store, &mut out).await
    })
}

fn build_runtime() -> Result<Runtime> {
    let runtime = Builder::new_current_thread()
        .thread_name("sheetctl")
        .enable_all()
        .build()?;

    Ok(runtime)
}
