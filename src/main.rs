#[macro_use]
extern crate error_chain;

use std::process;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod constants;
mod errors;
mod http;
mod metrics;
mod poller;
mod projects;
mod resolve;
mod rpc;
mod sink;
mod state;
mod tasks;
mod util;
mod workunit;

fn main() {
    let args = config::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("boinc_exporter=info")),
        )
        .init();

    let config = match config::Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "bad configuration");
            process::exit(2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(config)) {
        error!(error = %e, "exiting");
        process::exit(1);
    }
}

async fn run(config: config::Config) -> errors::Result<()> {
    let document = sink::SharedDocument::new();

    let mut poller = poller::Poller::new(&config);
    poller.add_sink(Box::new(document.clone()));
    if let Some(path) = &config.output {
        poller.add_sink(Box::new(sink::FileSink::new(path.clone())));
    }

    info!(
        addr = %config.rpc_addr,
        interval_secs = config.interval.as_secs(),
        output = ?config.output,
        "starting"
    );
    let polling = tokio::spawn(poller.run());

    let server = async {
        match config.listen {
            Some(addr) => http::serve(addr, document).await,
            None => futures::future::pending().await,
        }
    };

    let result = tokio::select! {
        r = server => r,
        r = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            r.map_err(errors::Error::from)
        }
    };
    polling.abort();
    result
}
