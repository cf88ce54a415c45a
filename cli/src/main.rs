//! Entry-point for the `mport` binary.
//!
//! Exit code 0 means the whole run completed; any unrecovered failure
//! (missing configuration, authentication, a timed-out wait, a malformed
//! transcript) surfaces as a non-zero exit with the error on stderr.
use clap::Parser;
use mport_cli::Cli;
use mport_cli::run_main;

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let cli = Cli::parse();
        run_main(cli).await?;
        Ok(())
    })
}
