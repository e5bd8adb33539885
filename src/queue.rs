use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::{Duration, Instant},
};

use crate::{
    error::{ScrawlError, ScrawlResult},
    job::RenderJob,
};

/// Minimal queue semantics the scheduler needs from its external queue
/// collaborator: claims carry a visibility timeout, so a crashed worker's
/// job becomes re-deliverable without coordination.
pub trait JobQueue: Send + Sync {
    /// Add a job to the backlog. Fails with `ResourceExhausted` when the
    /// backlog bound is hit.
    fn enqueue(&self, job: RenderJob) -> ScrawlResult<()>;

    /// Claim the next job, invisible to other consumers for
    /// `visibility_timeout`. `None` when nothing is ready.
    fn dequeue(&self, visibility_timeout: Duration) -> Option<RenderJob>;

    /// The claimed job finished (in any terminal state); drop it.
    fn ack(&self, job_id: &str);

    /// Give the claimed job back for immediate redelivery.
    fn nack(&self, job_id: &str);
}

/// In-process queue used by the CLI and tests. Jobs move between a ready
/// deque and an in-flight map with claim deadlines; expired claims migrate
/// back to ready on the next dequeue.
pub struct InMemoryQueue {
    capacity: usize,
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<RenderJob>,
    in_flight: HashMap<String, InFlight>,
}

struct InFlight {
    job: RenderJob,
    claim_expires: Instant,
}

impl InMemoryQueue {
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Cancel a job that has not been claimed yet. Returns whether a queued
    /// job was removed; once a worker holds the claim, cancellation is
    /// cooperative and goes through the scheduler instead.
    pub fn cancel_queued(&self, job_id: &str) -> bool {
        let mut state = self.state.lock().expect("queue lock");
        let before = state.ready.len();
        state.ready.retain(|j| j.job_id != job_id);
        state.ready.len() != before
    }

    pub fn ready_len(&self) -> usize {
        self.state.lock().expect("queue lock").ready.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.state.lock().expect("queue lock").in_flight.len()
    }

    fn requeue_expired(state: &mut QueueState, now: Instant) {
        let expired: Vec<String> = state
            .in_flight
            .iter()
            .filter(|(_, f)| f.claim_expires <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            if let Some(f) = state.in_flight.remove(&id) {
                tracing::warn!(job = %id, "claim expired, redelivering");
                state.ready.push_back(f.job);
            }
        }
    }
}

impl JobQueue for InMemoryQueue {
    fn enqueue(&self, job: RenderJob) -> ScrawlResult<()> {
        let mut state = self.state.lock().expect("queue lock");
        if state.ready.len() >= self.capacity {
            return Err(ScrawlError::resource(format!(
                "job backlog is full ({} jobs)",
                self.capacity
            )));
        }
        state.ready.push_back(job);
        Ok(())
    }

    fn dequeue(&self, visibility_timeout: Duration) -> Option<RenderJob> {
        let mut state = self.state.lock().expect("queue lock");
        let now = Instant::now();
        Self::requeue_expired(&mut state, now);

        let job = state.ready.pop_front()?;
        state.in_flight.insert(
            job.job_id.clone(),
            InFlight {
                job: job.clone(),
                claim_expires: now + visibility_timeout,
            },
        );
        Some(job)
    }

    fn ack(&self, job_id: &str) {
        let mut state = self.state.lock().expect("queue lock");
        state.in_flight.remove(job_id);
    }

    fn nack(&self, job_id: &str) {
        let mut state = self.state.lock().expect("queue lock");
        if let Some(f) = state.in_flight.remove(job_id) {
            state.ready.push_back(f.job);
        }
    }
}
