//! Periodic and on-demand refresh cycles.
//!
//! The first cycle starts immediately, then one every `period` (six hours
//! by default). A manual trigger starts an extra cycle at once without
//! waiting for the running one; the pipeline's generation counter makes
//! sure only the newest cycle's results reach the map.
//!
//! User actions arrive on the same command stream. They are applied
//! between polls of the running cycles and followed by a snapshot write.

use crate::commands::Command;
use crate::feeds::FeedClient;
use crate::geocode::Geocoder;
use crate::outputs::json;
use crate::pipeline::{CycleOutcome, Pipeline};
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    period: Duration,
    /// Where snapshots go; `None` keeps everything in memory.
    output_dir: Option<String>,
}

impl RefreshScheduler {
    pub fn new(period: Duration, output_dir: Option<String>) -> Self {
        Self { period, output_dir }
    }

    /// Drive refresh cycles and user commands until `shutdown` resolves.
    ///
    /// Returns the number of cycles that ran to completion, superseded
    /// ones included. Cycles still in flight at shutdown are dropped.
    pub async fn run<C, G, T, S>(&self, pipeline: &Pipeline<C, G>, commands: T, shutdown: S) -> usize
    where
        C: FeedClient,
        G: Geocoder,
        T: Stream<Item = Command>,
        S: Future<Output = ()>,
    {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let commands = commands.fuse();
        tokio::pin!(commands);
        tokio::pin!(shutdown);

        let mut in_flight = FuturesUnordered::new();
        let mut finished = 0;
        info!(period_secs = self.period.as_secs(), "Refresh scheduler started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    if !in_flight.is_empty() {
                        warn!(pending = in_flight.len(), "Abandoning in-flight cycles");
                    }
                    break;
                }
                _ = ticker.tick() => {
                    in_flight.push(pipeline.refresh());
                }
                Some(command) = commands.next() => match command {
                    Command::Refresh => {
                        info!("Manual refresh requested");
                        in_flight.push(pipeline.refresh());
                    }
                    Command::Action(action) => {
                        pipeline.perform(action);
                        self.persist(pipeline).await;
                    }
                },
                Some(outcome) = in_flight.next(), if !in_flight.is_empty() => {
                    finished += 1;
                    self.finish(pipeline, outcome).await;
                }
            }
        }

        self.persist(pipeline).await;
        info!(cycles = finished, generation = pipeline.generation(), "Refresh scheduler stopped");
        finished
    }

    /// Run exactly one cycle.
    pub async fn run_once<C: FeedClient, G: Geocoder>(&self, pipeline: &Pipeline<C, G>) -> CycleOutcome {
        let outcome = pipeline.refresh().await;
        self.finish(pipeline, outcome.clone()).await;
        outcome
    }

    async fn finish<C: FeedClient, G: Geocoder>(&self, pipeline: &Pipeline<C, G>, outcome: CycleOutcome) {
        match outcome {
            CycleOutcome::Committed { generation, entries, mapped } => {
                info!(generation, entries, mapped, "Map updated");
                self.persist(pipeline).await;
            }
            CycleOutcome::Failed { generation } => {
                warn!(generation, "Map kept from previous cycle");
                self.persist(pipeline).await;
            }
            CycleOutcome::Superseded { generation } => {
                info!(generation, "Cycle superseded");
            }
        }
    }

    async fn persist<C: FeedClient, G: Geocoder>(&self, pipeline: &Pipeline<C, G>) {
        let Some(dir) = &self.output_dir else {
            return;
        };
        if let Err(e) = json::write_snapshot(&pipeline.snapshot(), dir).await {
            error!(error = %e, output_dir = %dir, "Failed to write map snapshot");
        }
    }
}
