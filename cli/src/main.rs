mod commands;
mod terminal;

use commands::CommandLine;
use commands::scan::{self, ScanOptions};
use subrank_common::cancel::CancelToken;
use subrank_common::warn;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose, commands.quiet);
    if commands.quiet == 0 {
        print::banner();
    }

    let config = commands.to_config()?;
    let options = ScanOptions {
        output: commands.output.clone(),
        top: commands.top,
        quiet: commands.quiet,
    };

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight work...");
            on_interrupt.cancel();
        }
    });

    if commands.quiet == 0 {
        print::section(&format!("scanning {}", config.domain));
    }
    scan::scan(&config, &options, cancel).await?;
    if commands.quiet == 0 {
        print::fat_separator();
    }
    Ok(())
}
