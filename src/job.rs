use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::{
    compose::{self, FrameOutcome},
    core::FrameIndex,
    encode::OutputFormat,
    error::{ErrorKind, ScrawlError, ScrawlResult},
    model::Scene,
    style::PresetCatalog,
};

/// The unit of distributable work: one frame of one immutable scene
/// snapshot, with every input needed to render it independent of any other
/// job. Execution is a pure function of this bundle; two jobs for the same
/// (snapshot, frame) produce byte-identical encodings.
#[derive(Clone, Debug)]
pub struct RenderJob {
    pub job_id: String,
    pub scene: Arc<Scene>,
    pub catalog: Arc<PresetCatalog>,
    pub frame: FrameIndex,
    pub output: OutputSpec,
    /// Max execution duration; exceeding it is a transient failure.
    pub timeout: Option<Duration>,
}

#[derive(Clone, Copy, Debug)]
pub struct OutputSpec {
    pub format: OutputFormat,
}

/// Cooperative cancellation + deadline control for one job attempt.
///
/// Jobs are CPU-bound with no internal suspension points, so both signals
/// are observed at per-shape checkpoints, never mid-path.
#[derive(Clone, Debug)]
pub struct JobControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    limit: Option<Duration>,
}

impl JobControl {
    /// No deadline, cancellable only through this instance's clones.
    pub fn unbounded() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
            limit: None,
        }
    }

    /// Deadline starts counting immediately.
    pub fn with_timeout(limit: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + limit),
            limit: Some(limit),
        }
    }

    pub fn for_job(job: &RenderJob) -> Self {
        match job.timeout {
            Some(limit) => Self::with_timeout(limit),
            None => Self::unbounded(),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn check_deadline(&self) -> ScrawlResult<()> {
        if let (Some(deadline), Some(limit)) = (self.deadline, self.limit)
            && Instant::now() > deadline
        {
            return Err(ScrawlError::Timeout { limit });
        }
        Ok(())
    }
}

/// Validate a job before any work is spent on it. Every deterministic
/// input failure is caught here as `MalformedScene`, so it is never retried.
pub fn admit(job: &RenderJob) -> ScrawlResult<()> {
    job.scene.validate()?;
    job.catalog.validate()?;
    if job.frame.0 >= job.scene.frame_count() {
        return Err(ScrawlError::malformed(format!(
            "job '{}': frame {} is out of bounds (scene has {} frames)",
            job.job_id,
            job.frame.0,
            job.scene.frame_count()
        )));
    }
    for layer in &job.scene.layers {
        for shape in &layer.shapes {
            for kf in &shape.keyframes {
                job.catalog.get(&kf.style.preset)?;
            }
        }
    }
    Ok(())
}

/// Execute one job attempt: admission, then controlled frame composition.
#[tracing::instrument(skip(job, control), fields(job = %job.job_id, frame = job.frame.0))]
pub fn execute(job: &RenderJob, control: &JobControl) -> ScrawlResult<FrameOutcome> {
    admit(job)?;
    compose::compose_frame_controlled(&job.scene, &job.catalog, job.frame, control)
}

/// Terminal state of a job. `Cancelled` is an outcome, not a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum JobStatus {
    Succeeded,
    Failed,
    Cancelled,
}

/// The structured per-job record reported exactly once per job, for
/// observability collaborators.
#[derive(Clone, Debug, serde::Serialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    pub error_kind: Option<ErrorKind>,
    pub duration: Duration,
}

impl JobOutcome {
    pub fn succeeded(job_id: impl Into<String>, duration: Duration) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Succeeded,
            error_kind: None,
            duration,
        }
    }

    pub fn failed(job_id: impl Into<String>, err: &ScrawlError, duration: Duration) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Failed,
            error_kind: Some(err.kind()),
            duration,
        }
    }

    pub fn cancelled(job_id: impl Into<String>, duration: Duration) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Cancelled,
            error_kind: None,
            duration,
        }
    }
}
