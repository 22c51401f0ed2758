//! Fixed-size scoring worker pool with a restarting supervisor

use super::engine::score_symbol_isolated;
use super::types::{
    BatchReport, ScoreRequest, ScoreResult, ScoringError, SymbolFailure, NEUTRAL_SCORE,
};
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Number of workers
    pub workers: usize,
    /// Jobs that may wait in the queue before submitters block
    pub queue_depth: usize,
    /// Score given to symbols that fail
    pub neutral_score: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_worker_count(),
            queue_depth: 64,
            neutral_score: NEUTRAL_SCORE,
        }
    }
}

/// One worker per core minus one, at least two
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(2)
}

/// Per-symbol outcomes for one chunk, in chunk order
type ChunkOutcome = Vec<Result<f64, SymbolFailure>>;

/// A slice of a batch handed to one worker
struct Job {
    batch_id: Uuid,
    request: Arc<ScoreRequest>,
    range: Range<usize>,
    reply: oneshot::Sender<ChunkOutcome>,
}

enum WorkerMessage {
    Score(Job),
    #[cfg(test)]
    Crash,
}

/// Receiving side of the job queue, shared by every worker
#[derive(Clone)]
struct JobQueue {
    rx: Arc<Mutex<mpsc::Receiver<WorkerMessage>>>,
    /// Upcoming jobs a worker panics on while holding them
    #[cfg(test)]
    crash_jobs: Arc<AtomicUsize>,
}

impl JobQueue {
    fn new(rx: mpsc::Receiver<WorkerMessage>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
            #[cfg(test)]
            crash_jobs: Arc::new(AtomicUsize::new(0)),
        }
    }

    async fn next(&self) -> Option<WorkerMessage> {
        self.rx.lock().await.recv().await
    }

    #[cfg(test)]
    fn take_crash(&self) -> bool {
        self.crash_jobs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Pool of stateless scoring workers.
///
/// A batch is split into contiguous chunks, one per worker, and the chunk
/// results are reassembled in request order. Workers share nothing but the
/// job queue.
pub struct ScoringPool {
    config: PoolConfig,
    tx: mpsc::Sender<WorkerMessage>,
    supervisor: JoinHandle<()>,
    active: Arc<AtomicUsize>,
    restarts: Arc<AtomicU64>,
    #[cfg(test)]
    crash_jobs: Arc<AtomicUsize>,
}

impl ScoringPool {
    /// Start the pool. Must be called inside a Tokio runtime.
    pub fn new(config: PoolConfig) -> Self {
        let workers = config.workers.max(1);
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        let queue = JobQueue::new(rx);
        let active = Arc::new(AtomicUsize::new(0));
        let restarts = Arc::new(AtomicU64::new(0));

        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            Self::spawn_worker(&mut set, worker_id, queue.clone(), active.clone());
        }

        #[cfg(test)]
        let crash_jobs = queue.crash_jobs.clone();

        let supervisor = tokio::spawn(Self::supervise(
            set,
            workers,
            queue,
            active.clone(),
            restarts.clone(),
        ));

        tracing::info!(workers, "Scoring pool started");

        Self {
            config: PoolConfig { workers, ..config },
            tx,
            supervisor,
            active,
            restarts,
            #[cfg(test)]
            crash_jobs,
        }
    }

    /// Number of configured workers
    pub fn workers(&self) -> usize {
        self.config.workers
    }

    /// Workers currently alive
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Workers restarted after a crash
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Score a batch.
    ///
    /// Symbols that fail receive the neutral score and are listed in the
    /// report. A chunk lost to a worker crash is re-executed once before
    /// falling back to neutral scores.
    pub async fn score(&self, request: ScoreRequest) -> Result<BatchReport, ScoringError> {
        request.validate()?;

        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        let request = Arc::new(request);
        let total = request.symbols.len();

        let chunk_size = total.div_ceil(self.config.workers).max(1);
        let mut pending = Vec::new();
        for start in (0..total).step_by(chunk_size) {
            let range = start..(start + chunk_size).min(total);
            let rx = self.dispatch(batch_id, &request, range.clone()).await?;
            pending.push((range, rx));
        }

        let mut results = Vec::with_capacity(total);
        let mut failed_symbols = Vec::new();

        for (range, rx) in pending {
            let outcome = match rx.await {
                Ok(outcome) => Some(outcome),
                Err(_) => {
                    tracing::warn!(
                        batch_id = %batch_id,
                        chunk_start = range.start,
                        "Worker lost chunk, re-executing"
                    );
                    let retry = self.dispatch(batch_id, &request, range.clone()).await?;
                    retry.await.ok()
                }
            };

            let symbols = &request.symbols[range];
            match outcome {
                Some(scores) => {
                    for (symbol, score) in symbols.iter().zip(scores) {
                        let score = match score {
                            Ok(score) => score,
                            Err(e) => {
                                tracing::warn!(symbol = %symbol, error = %e, "Symbol scoring failed");
                                failed_symbols.push(symbol.clone());
                                self.config.neutral_score
                            }
                        };
                        results.push(ScoreResult {
                            symbol: symbol.clone(),
                            score,
                        });
                    }
                }
                None => {
                    for symbol in symbols {
                        failed_symbols.push(symbol.clone());
                        results.push(ScoreResult {
                            symbol: symbol.clone(),
                            score: self.config.neutral_score,
                        });
                    }
                }
            }
        }

        if !failed_symbols.is_empty() {
            telemetry::increment_by(CounterMetric::ScoringSymbolFailure, failed_symbols.len() as u64);
        }
        telemetry::record_latency(LatencyMetric::ScoringBatch, started.elapsed());

        tracing::info!(
            batch_id = %batch_id,
            symbols = total,
            failures = failed_symbols.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Scoring batch complete"
        );

        Ok(BatchReport {
            batch_id,
            results,
            failed_symbols,
        })
    }

    /// Stop accepting work and wait for every worker to finish
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.supervisor.await {
            tracing::error!(error = %e, "Scoring supervisor failed");
        }
        tracing::info!("Scoring pool stopped");
    }

    async fn dispatch(
        &self,
        batch_id: Uuid,
        request: &Arc<ScoreRequest>,
        range: Range<usize>,
    ) -> Result<oneshot::Receiver<ChunkOutcome>, ScoringError> {
        let (reply, rx) = oneshot::channel();
        let job = Job {
            batch_id,
            request: request.clone(),
            range,
            reply,
        };
        self.tx
            .send(WorkerMessage::Score(job))
            .await
            .map_err(|_| ScoringError::PoolClosed)?;
        Ok(rx)
    }

    #[cfg(test)]
    async fn inject_crash(&self) {
        let _ = self.tx.send(WorkerMessage::Crash).await;
    }

    /// Make workers panic on the next `jobs` jobs they pick up
    #[cfg(test)]
    fn crash_on_next_jobs(&self, jobs: usize) {
        self.crash_jobs.store(jobs, Ordering::SeqCst);
    }

    fn spawn_worker(
        set: &mut JoinSet<usize>,
        worker_id: usize,
        queue: JobQueue,
        active: Arc<AtomicUsize>,
    ) {
        active.fetch_add(1, Ordering::SeqCst);
        telemetry::set_gauge(GaugeMetric::ActiveWorkers, active.load(Ordering::SeqCst) as f64);
        set.spawn(Self::run_worker(worker_id, queue));
    }

    /// Restart workers that panic; exit once every worker has stopped
    async fn supervise(
        mut set: JoinSet<usize>,
        mut next_id: usize,
        queue: JobQueue,
        active: Arc<AtomicUsize>,
        restarts: Arc<AtomicU64>,
    ) {
        while let Some(joined) = set.join_next().await {
            active.fetch_sub(1, Ordering::SeqCst);

            match joined {
                Ok(worker_id) => {
                    tracing::debug!(worker_id, "Scoring worker exited");
                }
                Err(e) if e.is_panic() => {
                    restarts.fetch_add(1, Ordering::SeqCst);
                    telemetry::increment(CounterMetric::WorkerRestart);
                    tracing::warn!(worker_id = next_id, "Scoring worker crashed, restarting");
                    Self::spawn_worker(&mut set, next_id, queue.clone(), active.clone());
                    next_id += 1;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Scoring worker cancelled");
                }
            }
            telemetry::set_gauge(GaugeMetric::ActiveWorkers, active.load(Ordering::SeqCst) as f64);
        }
    }

    async fn run_worker(worker_id: usize, queue: JobQueue) -> usize {
        loop {
            match queue.next().await {
                Some(WorkerMessage::Score(job)) => {
                    #[cfg(test)]
                    {
                        if queue.take_crash() {
                            panic!(
                                "injected crash in worker {} holding batch {}",
                                worker_id, job.batch_id
                            );
                        }
                    }
                    Self::run_job(worker_id, job).await;
                }
                #[cfg(test)]
                Some(WorkerMessage::Crash) => panic!("injected crash in worker {}", worker_id),
                None => return worker_id,
            }
        }
    }

    /// Score one chunk on the blocking pool so async tasks keep running
    async fn run_job(worker_id: usize, job: Job) {
        if job.reply.is_closed() {
            tracing::debug!(worker_id, batch_id = %job.batch_id, "Submitter gone, skipping job");
            return;
        }

        let batch_id = job.batch_id;
        let scored = tokio::task::spawn_blocking(move || {
            let outcome: ChunkOutcome = job.request.symbols[job.range.clone()]
                .iter()
                .map(|symbol| score_symbol_isolated(symbol, &job.request))
                .collect();

            // The submitter may have gone away while we computed
            let _ = job.reply.send(outcome);
        })
        .await;

        if let Err(e) = scored {
            tracing::error!(worker_id, batch_id = %batch_id, error = %e, "Scoring job failed");
        }
    }
}
