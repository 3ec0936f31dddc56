use clap::Parser;
use e5check::{cli::Cli, logging, runner};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    // Failures are reported through log lines and the notification payload;
    // the process itself always exits cleanly.
    runner::run(cli.into()).await;
}
