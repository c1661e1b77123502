use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::errors;
use crate::metrics;
use crate::rpc::RpcChannel;
use crate::sink::Sink;

/// Periodically pulls the client state and hands the rendered document to every sink.
pub struct Poller {
    rpc_addr: String,
    host: String,
    password: String,
    interval: Duration,
    sinks: Vec<Box<dyn Sink>>,
    published: u64,
}

impl Poller {
    pub fn new(config: &Config) -> Poller {
        Poller {
            rpc_addr: config.rpc_addr.clone(),
            host: config.host.clone(),
            password: config.password.clone(),
            interval: config.interval,
            sinks: Vec::new(),
            published: 0,
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    /// One full exchange on a fresh connection, returning the rendered document.
    pub async fn poll_once(&self) -> errors::Result<String> {
        let mut channel = RpcChannel::open(&self.rpc_addr).await?;
        channel.authorize(&self.password).await?;
        let state = channel.get_state().await?;
        if let Err(e) = channel.close().await {
            debug!(error = %e, "closing rpc connection");
        }

        debug!(
            projects = state.projects.len(),
            results = state.results.len(),
            workunits = state.workunits.len(),
            "client state received"
        );
        Ok(metrics::format(&state, &self.host))
    }

    /// Polls once and publishes the result. On error nothing is published.
    pub async fn run_cycle(&mut self) -> errors::Result<()> {
        let t0 = Instant::now();
        let document: Arc<str> = Arc::from(self.poll_once().await?);

        for sink in &self.sinks {
            if let Err(e) = sink.publish(document.clone()) {
                error!(sink = sink.name(), error = %e, "failed to publish metrics");
            }
        }
        self.published += 1;

        let elapsed = t0.elapsed();
        if self.published == 1 {
            info!(
                duration_ms = elapsed.as_millis() as u64,
                bytes = document.len(),
                "first metrics published"
            );
        } else {
            debug!(
                duration_ms = elapsed.as_millis() as u64,
                bytes = document.len(),
                cycle = self.published,
                "metrics published"
            );
        }
        Ok(())
    }

    pub async fn run(mut self) {
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick.tick().await;
            if let Err(e) = self.run_cycle().await {
                warn!(addr = %self.rpc_addr, error = %e, "poll failed, keeping previous metrics");
            }
        }
    }
}
