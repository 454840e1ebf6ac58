use crate::bridge::{ChunkKind, ExecuteOptions, KillSwitch, ProcessBridge};
use crate::jobs::events::ProgressBus;
use crate::jobs::{Job, JobProgressEvent, JobStatus, ProgressKind};
use crate::shared::{now_millis, JobId, RuntimeLog};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_RECENT_LIMIT: usize = 10;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

#[derive(Debug, Default)]
struct Registry {
    jobs: HashMap<JobId, Job>,
    order: Vec<JobId>,
    queue: VecDeque<JobId>,
    draining: bool,
    bus: ProgressBus,
}

impl Registry {
    fn allocate_id(&self, now: i64) -> JobId {
        let mut seq = self.order.len() as u32;
        loop {
            let id = JobId::generate(now, seq);
            if !self.jobs.contains_key(&id) {
                return id;
            }
            seq = seq.wrapping_add(1);
        }
    }

    fn next_queued(&mut self) -> Option<(JobId, String)> {
        while let Some(id) = self.queue.pop_front() {
            if let Some(job) = self.jobs.get(&id).filter(|job| job.status == JobStatus::Queued) {
                return Some((id, job.command.clone()));
            }
        }
        None
    }

    /// Apply `transition` and publish `kind` when it reports a change.
    fn transition<F>(
        &mut self,
        id: &JobId,
        kind: ProgressKind,
        content: Option<String>,
        transition: F,
    ) -> Option<Job>
    where
        F: FnOnce(&mut Job) -> bool,
    {
        let job = self.jobs.get_mut(id)?;
        if !transition(job) {
            return None;
        }
        let snapshot = job.clone();
        self.bus.publish(&JobProgressEvent {
            job_id: id.clone(),
            kind,
            content,
            job: snapshot.clone(),
        });
        Some(snapshot)
    }
}

#[derive(Debug)]
struct Shared {
    registry: Mutex<Registry>,
    bridge: ProcessBridge,
    kill_switch: KillSwitch,
    options: ExecuteOptions,
    log: RuntimeLog,
}

/// Owns job identity and lifecycle and serializes execution through one
/// [`ProcessBridge`].
///
/// Cloning yields another handle to the same manager. Work runs on a single
/// drain worker thread that exists only while the queue is non-empty; no other
/// code path can start the bridge, so at most one job is ever `running`.
#[derive(Debug, Clone)]
pub struct JobManager {
    shared: Arc<Shared>,
}

/// Receiving end of a progress subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: Receiver<JobProgressEvent>,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Blocks for the next event; `None` once the subscription is closed.
    pub fn recv(&self) -> Option<JobProgressEvent> {
        self.receiver.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<JobProgressEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn iter(&self) -> impl Iterator<Item = JobProgressEvent> + '_ {
        self.receiver.iter()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.registry).bus.unsubscribe(self.id);
        }
    }
}

impl JobManager {
    pub fn new(bridge: ProcessBridge, options: ExecuteOptions, log: RuntimeLog) -> Self {
        let kill_switch = bridge.kill_switch();
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                bridge,
                kill_switch,
                options,
                log,
            }),
        }
    }

    pub fn create_job(&self, owner: &str, command: &str) -> Job {
        self.enqueue(owner, command, false).0
    }

    /// Like [`JobManager::create_job`], with a subscription to the new job that
    /// is registered before the job can start, so no event is missed.
    pub fn create_job_subscribed(&self, owner: &str, command: &str) -> (Job, Subscription) {
        let (job, subscription) = self.enqueue(owner, command, true);
        let subscription = subscription.unwrap_or_else(|| self.subscribe_job(&job.id));
        (job, subscription)
    }

    pub fn get_job(&self, id: &str) -> Option<Job> {
        lock(&self.shared.registry).jobs.get(id).cloned()
    }

    pub fn get_active_jobs(&self, owner: Option<&str>) -> Vec<Job> {
        let registry = lock(&self.shared.registry);
        registry
            .order
            .iter()
            .filter_map(|id| registry.jobs.get(id))
            .filter(|job| job.status.is_active())
            .filter(|job| owner.map_or(true, |owner| job.owner == owner))
            .cloned()
            .collect()
    }

    pub fn get_recent_jobs(&self, owner: Option<&str>, limit: usize) -> Vec<Job> {
        let mut jobs: Vec<Job> = {
            let registry = lock(&self.shared.registry);
            registry
                .order
                .iter()
                .filter_map(|id| registry.jobs.get(id))
                .filter(|job| owner.map_or(true, |owner| job.owner == owner))
                .cloned()
                .collect()
        };
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        jobs
    }

    /// Cancel a queued or running job. Returns false for unknown or finished jobs.
    pub fn cancel_job(&self, id: &str) -> bool {
        let mut registry = lock(&self.shared.registry);
        let Some((job_id, status)) = registry
            .jobs
            .get(id)
            .map(|job| (job.id.clone(), job.status))
        else {
            return false;
        };

        match status {
            JobStatus::Queued => {
                registry.queue.retain(|queued| *queued != job_id);
            }
            JobStatus::Running => {
                self.shared.kill_switch.kill();
            }
            _ => return false,
        }

        let now = now_millis();
        registry.transition(&job_id, ProgressKind::Cancelled, None, |job| {
            job.cancel(now)
        });
        self.shared.log.info(
            "job.cancelled",
            "job cancelled",
            json!({ "jobId": job_id.as_str(), "previousStatus": status.as_str() }),
        );
        true
    }

    /// Subscribe to every job's events until the subscription is dropped.
    pub fn subscribe(&self) -> Subscription {
        let mut registry = lock(&self.shared.registry);
        self.subscribe_locked(&mut registry, None)
    }

    /// Subscribe to one job. The subscription closes after the job's terminal
    /// event; for an unknown or already finished job it is closed immediately.
    pub fn subscribe_job(&self, id: &JobId) -> Subscription {
        let mut registry = lock(&self.shared.registry);
        let finished = registry
            .jobs
            .get(id)
            .map_or(true, |job| job.status.is_terminal());
        let subscription = self.subscribe_locked(&mut registry, Some(id.clone()));
        if finished {
            registry.bus.unsubscribe(subscription.id);
        }
        subscription
    }

    /// Block until the job reaches a terminal state and return that snapshot.
    ///
    /// Returns `None` for an unknown job or when `timeout` elapses first.
    pub fn wait_for_job(&self, id: &str, timeout: Option<Duration>) -> Option<Job> {
        let subscription = {
            let mut registry = lock(&self.shared.registry);
            let job = registry.jobs.get(id)?;
            if job.status.is_terminal() {
                return Some(job.clone());
            }
            let scope = job.id.clone();
            self.subscribe_locked(&mut registry, Some(scope))
        };

        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        loop {
            let event = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match subscription.recv_timeout(remaining) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => return None,
                        Err(RecvTimeoutError::Disconnected) => return self.terminal_job(id),
                    }
                }
                None => match subscription.recv() {
                    Some(event) => event,
                    None => return self.terminal_job(id),
                },
            };
            if event.kind.is_terminal() {
                return Some(event.job);
            }
        }
    }

    pub fn is_bridge_running(&self) -> bool {
        self.shared.kill_switch.is_running()
    }

    pub fn options(&self) -> &ExecuteOptions {
        &self.shared.options
    }

    fn terminal_job(&self, id: &str) -> Option<Job> {
        self.get_job(id).filter(|job| job.status.is_terminal())
    }

    fn subscribe_locked(&self, registry: &mut Registry, scope: Option<JobId>) -> Subscription {
        let (id, receiver) = registry.bus.subscribe(scope);
        Subscription {
            id,
            receiver,
            shared: Arc::downgrade(&self.shared),
        }
    }

    fn enqueue(&self, owner: &str, command: &str, subscribe: bool) -> (Job, Option<Subscription>) {
        let (job, subscription, spawn_worker) = {
            let mut registry = lock(&self.shared.registry);
            let now = now_millis();
            let id = registry.allocate_id(now);
            let job = Job::new(id.clone(), owner, command, now);
            registry.jobs.insert(id.clone(), job.clone());
            registry.order.push(id.clone());
            registry.queue.push_back(id.clone());
            let subscription = subscribe.then(|| self.subscribe_locked(&mut registry, Some(id)));
            let spawn_worker = !registry.draining;
            registry.draining = true;
            (job, subscription, spawn_worker)
        };

        self.shared.log.info(
            "job.created",
            "job created",
            json!({
                "jobId": job.id.as_str(),
                "owner": job.owner,
                "commandLength": command.chars().count(),
            }),
        );

        if spawn_worker {
            let shared = Arc::clone(&self.shared);
            thread::spawn(move || drain_queue(&shared));
        }
        (job, subscription)
    }
}

fn drain_queue(shared: &Shared) {
    loop {
        let (id, running) = {
            let mut registry = lock(&shared.registry);
            let Some((id, command)) = registry.next_queued() else {
                registry.draining = false;
                return;
            };

            match shared.bridge.start(&command, &shared.options) {
                Ok(running) => {
                    let now = now_millis();
                    registry.transition(&id, ProgressKind::Started, None, |job| job.start(now));
                    (id, running)
                }
                Err(err) => {
                    let now = now_millis();
                    let error = err.to_string();
                    registry.transition(&id, ProgressKind::Started, None, |job| job.start(now));
                    registry.transition(&id, ProgressKind::Failed, Some(error.clone()), |job| {
                        job.fail(now, error.clone())
                    });
                    shared.log.error(
                        "job.failed",
                        "job could not be started",
                        json!({ "jobId": id.as_str(), "error": error }),
                    );
                    continue;
                }
            }
        };

        shared.log.info(
            "job.started",
            "job started",
            json!({ "jobId": id.as_str(), "pid": running.pid() }),
        );

        let result = running.wait(|chunk| match chunk.kind {
            ChunkKind::Text => {
                let content = chunk.content;
                lock(&shared.registry).transition(
                    &id,
                    ProgressKind::Output,
                    Some(content.clone()),
                    |job| job.append_output(content.clone()),
                );
            }
            _ => shared.log.debug(
                "job.chunk",
                &chunk.content,
                json!({ "jobId": id.as_str(), "kind": chunk.kind, "tool": chunk.tool_name }),
            ),
        });

        let mut registry = lock(&shared.registry);
        let now = now_millis();
        match result {
            Ok(output) => {
                let completed =
                    registry.transition(&id, ProgressKind::Completed, Some(output.clone()), |job| {
                        job.complete(now, &output)
                    });
                if let Some(job) = completed {
                    shared.log.info(
                        "job.completed",
                        "job completed",
                        json!({ "jobId": id.as_str(), "durationMs": job.duration_ms() }),
                    );
                }
            }
            Err(err) => {
                let error = err.to_string();
                let failed =
                    registry.transition(&id, ProgressKind::Failed, Some(error.clone()), |job| {
                        job.fail(now, error.clone())
                    });
                if failed.is_some() {
                    shared.log.error(
                        "job.failed",
                        "job failed",
                        json!({ "jobId": id.as_str(), "error": error }),
                    );
                } else {
                    shared.log.debug(
                        "job.cancel_race",
                        "suppressed failure of a cancelled job",
                        json!({ "jobId": id.as_str(), "error": error }),
                    );
                }
            }
        }
    }
}
