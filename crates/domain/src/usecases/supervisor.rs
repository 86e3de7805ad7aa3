//! Source supervisor - runs every ingest job on a fixed interval
//!
//! Each tick launches every job whose previous run has finished; a job still
//! in flight is skipped for that tick so two runs of the same source never
//! overlap. Finished runs report back over a channel instead of being dropped.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};

use crate::model::IngestReport;
use crate::ports::Ingest;

/// Configuration for the supervisor
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Time between the starts of two rounds
    pub interval: Duration,
    /// Launch a round immediately instead of waiting one interval
    pub run_on_start: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
            run_on_start: true,
        }
    }
}

/// What happened to one job in one round
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(IngestReport),
    Failed(String),
    /// The previous run of this job was still in flight
    Skipped,
}

/// Result of one job in one round
#[derive(Debug)]
pub struct CycleReport {
    pub source: String,
    pub outcome: CycleOutcome,
    pub elapsed: Duration,
}

struct Slot {
    job: Arc<dyn Ingest>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the run ends, panics included
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Supervises the registered ingest jobs
pub struct Supervisor {
    slots: Vec<Slot>,
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(jobs: Vec<Arc<dyn Ingest>>, config: SupervisorConfig) -> Self {
        let slots = jobs
            .into_iter()
            .map(|job| Slot {
                job,
                in_flight: Arc::new(AtomicBool::new(false)),
            })
            .collect();
        Self { slots, config }
    }

    /// Names of the supervised jobs
    pub fn sources(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.job.name().to_string()).collect()
    }

    /// Run one round and wait for every job in it to finish
    pub async fn run_once(&self) -> Vec<CycleReport> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.launch(&tx);
        drop(tx);

        let mut reports = Vec::with_capacity(self.slots.len());
        while let Some(report) = rx.recv().await {
            log_report(&report);
            reports.push(report);
        }
        reports
    }

    /// Launch a round every interval until `shutdown` resolves.
    ///
    /// The interval is measured from the start of one round to the start of
    /// the next; rounds do not wait for the previous one to finish.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if !self.config.run_on_start {
            ticker.tick().await;
        }

        tracing::info!(
            sources = ?self.sources(),
            interval_secs = self.config.interval.as_secs(),
            "Supervisor started"
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let launched = self.launch(&tx);
                    tracing::debug!(launched, "Round started");
                }
                Some(report) = rx.recv() => log_report(&report),
                _ = &mut shutdown => {
                    tracing::info!("Supervisor shutting down");
                    break;
                }
            }
        }
    }

    /// Spawn every idle job, returning how many were launched
    fn launch(&self, tx: &mpsc::UnboundedSender<CycleReport>) -> usize {
        let mut launched = 0;

        for slot in &self.slots {
            let source = slot.job.name().to_string();

            if slot
                .in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                let _ = tx.send(CycleReport {
                    source,
                    outcome: CycleOutcome::Skipped,
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            let guard = InFlightGuard(Arc::clone(&slot.in_flight));
            let job = Arc::clone(&slot.job);
            let tx = tx.clone();

            tokio::spawn(async move {
                let started = Instant::now();

                let outcome = match tokio::spawn(async move { job.run().await }).await {
                    Ok(Ok(report)) => CycleOutcome::Completed(report),
                    Ok(Err(e)) => CycleOutcome::Failed(e.to_string()),
                    Err(e) => CycleOutcome::Failed(format!("ingest task aborted: {}", e)),
                };
                drop(guard);

                let _ = tx.send(CycleReport {
                    source,
                    outcome,
                    elapsed: started.elapsed(),
                });
            });
            launched += 1;
        }

        launched
    }
}

fn log_report(report: &CycleReport) {
    match &report.outcome {
        CycleOutcome::Completed(summary) => tracing::info!(
            source = %report.source,
            pages = summary.pages,
            inserted = summary.inserted,
            skipped = summary.skipped,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Ingest cycle complete"
        ),
        CycleOutcome::Failed(error) => tracing::error!(
            source = %report.source,
            error = %error,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Ingest cycle failed"
        ),
        CycleOutcome::Skipped => tracing::warn!(
            source = %report.source,
            "Previous run still in flight, skipping this round"
        ),
    }
}
