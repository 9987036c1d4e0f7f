use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::args::Opt;

mod args;
mod config;
mod errors;
mod run;

#[tokio::main]
async fn main() {
    let opt = Opt::parse();

    let tracing_level = if opt.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // diagnostics go to stderr, stdout is reserved for the changelog
    tracing_subscriber::fmt::fmt()
        .with_max_level(tracing_level)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            interrupt.cancel();
        }
    });

    match run::execute(&opt, &cancel).await {
        Ok(Some(output)) => println!("{}", output.trim_end()),
        Ok(None) => {}
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}
