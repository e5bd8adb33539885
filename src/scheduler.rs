use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, mpsc},
    time::{Duration, Instant},
};

use crate::{
    compose::FrameOutcome,
    encode,
    error::{ScrawlError, ScrawlResult},
    job::{self, JobControl, JobOutcome, RenderJob},
    queue::JobQueue,
};

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Worker concurrency W: at most this many jobs run at once.
    pub workers: usize,
    /// Retry budget for transient failures. Terminal errors never retry.
    pub max_retries: u32,
    /// Base of the exponential backoff between retry attempts.
    pub retry_backoff: Duration,
    /// Claim window handed to the queue. Must comfortably exceed the
    /// longest expected attempt (timeout + backoff), or a still-running
    /// job's claim expires and it gets redelivered.
    pub visibility_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_retries: 2,
            retry_backoff: Duration::from_millis(50),
            visibility_timeout: Duration::from_secs(60),
        }
    }
}

/// The execution seam: the scheduler drives any executor with the same
/// claim/retry/report logic. Production uses [`RenderExecutor`]; tests
/// substitute failure-injecting executors.
pub trait JobExecutor: Send + Sync {
    fn execute(&self, job: &RenderJob, control: &JobControl) -> ScrawlResult<FrameOutcome>;
}

/// Executes jobs through the real render pipeline.
pub struct RenderExecutor;

impl JobExecutor for RenderExecutor {
    fn execute(&self, job: &RenderJob, control: &JobControl) -> ScrawlResult<FrameOutcome> {
        job::execute(job, control)
    }
}

/// A terminal job report plus, on success, the encoded artifact for the
/// storage collaborator. The outcome alone is the observability record.
#[derive(Debug)]
pub struct JobResult {
    pub outcome: JobOutcome,
    pub payload: Option<Vec<u8>>,
}

/// Cooperative cancellation registry shared between the scheduler and its
/// callers. Requests made before a claim skip execution entirely; requests
/// against a running job flip its control flag, observed at the next
/// per-shape checkpoint.
#[derive(Default)]
pub struct Cancellations {
    inner: Mutex<CancelState>,
}

#[derive(Default)]
struct CancelState {
    requested: HashSet<String>,
    running: HashMap<String, JobControl>,
}

impl Cancellations {
    pub fn request(&self, job_id: &str) {
        let mut state = self.inner.lock().expect("cancel lock");
        state.requested.insert(job_id.to_string());
        if let Some(control) = state.running.get(job_id) {
            control.cancel();
        }
    }

    fn is_requested(&self, job_id: &str) -> bool {
        self.inner
            .lock()
            .expect("cancel lock")
            .requested
            .contains(job_id)
    }

    fn register(&self, job_id: &str, control: &JobControl) {
        let mut state = self.inner.lock().expect("cancel lock");
        if state.requested.contains(job_id) {
            control.cancel();
        }
        state.running.insert(job_id.to_string(), control.clone());
    }

    fn unregister(&self, job_id: &str) {
        self.inner
            .lock()
            .expect("cancel lock")
            .running
            .remove(job_id);
    }
}

/// Pull-based scheduler over a [`JobQueue`]: claims jobs, executes up to
/// `workers` concurrently on a dedicated thread pool, and reports each
/// job's terminal result exactly once.
///
/// Jobs are independent and side-effect-free, so workers share nothing but
/// the queue and the outcome channel.
pub struct WorkerScheduler {
    config: SchedulerConfig,
    pool: rayon::ThreadPool,
}

type AttemptMsg = (RenderJob, u32, Duration, ScrawlResult<Option<Vec<u8>>>);

impl WorkerScheduler {
    pub fn new(config: SchedulerConfig) -> ScrawlResult<Self> {
        if config.workers == 0 {
            return Err(ScrawlError::malformed("scheduler workers must be > 0"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("scrawl-worker-{i}"))
            .build()
            .map_err(|e| ScrawlError::resource(format!("could not build worker pool: {e}")))?;
        Ok(Self { config, pool })
    }

    /// Run the real pipeline until the queue drains.
    pub fn drain(&self, queue: &dyn JobQueue) -> Vec<JobResult> {
        self.drain_with(queue, &RenderExecutor, &Cancellations::default())
    }

    /// Run until the queue has no ready jobs and no in-flight attempts.
    ///
    /// Per-job state machine: Queued -> Running -> {Succeeded, Failed,
    /// Cancelled}. Transient failures are nacked and retried with
    /// exponential backoff up to `max_retries`, then surfaced as
    /// `JobFailedPermanently`. Terminal failures report on first sight.
    #[tracing::instrument(skip_all)]
    pub fn drain_with(
        &self,
        queue: &dyn JobQueue,
        executor: &dyn JobExecutor,
        cancels: &Cancellations,
    ) -> Vec<JobResult> {
        let mut results = Vec::new();

        self.pool.in_place_scope(|scope| {
            let (tx, rx) = mpsc::channel::<AttemptMsg>();
            let mut attempts: HashMap<String, u32> = HashMap::new();
            let mut in_flight = 0usize;

            loop {
                while in_flight < self.config.workers {
                    let Some(claimed) = queue.dequeue(self.config.visibility_timeout) else {
                        break;
                    };

                    if cancels.is_requested(&claimed.job_id) {
                        queue.ack(&claimed.job_id);
                        results.push(JobResult {
                            outcome: JobOutcome::cancelled(&claimed.job_id, Duration::ZERO),
                            payload: None,
                        });
                        continue;
                    }

                    let attempt = {
                        let n = attempts.entry(claimed.job_id.clone()).or_insert(0);
                        *n += 1;
                        *n
                    };
                    let control = JobControl::for_job(&claimed);
                    cancels.register(&claimed.job_id, &control);

                    let backoff = self.backoff_before(attempt);
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        if !backoff.is_zero() {
                            std::thread::sleep(backoff);
                        }
                        let start = Instant::now();
                        let res = run_attempt(executor, &claimed, &control);
                        let elapsed = start.elapsed();
                        let _ = tx.send((claimed, attempt, elapsed, res));
                    });
                    in_flight += 1;
                }

                if in_flight == 0 {
                    break;
                }

                let Ok((fin, attempt, elapsed, res)) = rx.recv() else {
                    break;
                };
                in_flight -= 1;
                cancels.unregister(&fin.job_id);
                self.settle(queue, &mut results, fin, attempt, elapsed, res);
            }
        });

        results
    }

    fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.config.retry_backoff * 2u32.saturating_pow(attempt - 2)
    }

    fn settle(
        &self,
        queue: &dyn JobQueue,
        results: &mut Vec<JobResult>,
        job: RenderJob,
        attempt: u32,
        elapsed: Duration,
        res: ScrawlResult<Option<Vec<u8>>>,
    ) {
        match res {
            Ok(Some(payload)) => {
                queue.ack(&job.job_id);
                tracing::debug!(job = %job.job_id, ?elapsed, "job succeeded");
                results.push(JobResult {
                    outcome: JobOutcome::succeeded(&job.job_id, elapsed),
                    payload: Some(payload),
                });
            }
            Ok(None) => {
                queue.ack(&job.job_id);
                tracing::debug!(job = %job.job_id, "job cancelled cooperatively");
                results.push(JobResult {
                    outcome: JobOutcome::cancelled(&job.job_id, elapsed),
                    payload: None,
                });
            }
            Err(err) if err.is_transient() && attempt <= self.config.max_retries => {
                tracing::warn!(job = %job.job_id, attempt, %err, "transient failure, will retry");
                queue.nack(&job.job_id);
            }
            Err(err) => {
                queue.ack(&job.job_id);
                let err = if err.is_transient() {
                    ScrawlError::JobFailedPermanently {
                        attempts: attempt,
                        source: Box::new(err),
                    }
                } else {
                    err
                };
                tracing::warn!(job = %job.job_id, attempt, %err, "job failed");
                results.push(JobResult {
                    outcome: JobOutcome::failed(&job.job_id, &err, elapsed),
                    payload: None,
                });
            }
        }
    }
}

/// One attempt: execute, then encode the frame while still on the worker.
/// `Ok(None)` means the job observed cancellation and produced nothing.
fn run_attempt(
    executor: &dyn JobExecutor,
    job: &RenderJob,
    control: &JobControl,
) -> ScrawlResult<Option<Vec<u8>>> {
    match executor.execute(job, control)? {
        FrameOutcome::Document(doc) => {
            let bytes = encode::encode(&doc, job.output.format)?;
            Ok(Some(bytes))
        }
        FrameOutcome::Cancelled => Ok(None),
    }
}
