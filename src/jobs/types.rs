use crate::shared::JobId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one job. Only the job manager mutates the live copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub owner: String,
    pub command: String,
    pub status: JobStatus,
    pub output: Vec<String>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub error: Option<String>,
}

impl Job {
    pub(crate) fn new(id: JobId, owner: &str, command: &str, now: i64) -> Self {
        Self {
            id,
            owner: owner.to_string(),
            command: command.to_string(),
            status: JobStatus::Queued,
            output: Vec::new(),
            created_at: now,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    /// Fragments concatenated as streamed; raw lines already carry their breaks.
    pub fn joined_output(&self) -> String {
        self.output.concat().trim_end().to_string()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        Some(self.completed_at? - self.started_at?)
    }

    pub(crate) fn start(&mut self, now: i64) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Running;
        self.started_at = Some(now);
        true
    }

    pub(crate) fn append_output(&mut self, fragment: String) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.output.push(fragment);
        true
    }

    /// `result` is kept only when nothing was streamed, so the output is never empty
    /// for a job that produced a final result.
    pub(crate) fn complete(&mut self, now: i64, result: &str) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        if self.output.is_empty() && !result.is_empty() {
            self.output.push(result.to_string());
        }
        self.status = JobStatus::Completed;
        self.completed_at = Some(now);
        true
    }

    pub(crate) fn fail(&mut self, now: i64, error: String) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Failed;
        self.completed_at = Some(now);
        self.error = Some(error);
        true
    }

    pub(crate) fn cancel(&mut self, now: i64) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(now);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    Started,
    Output,
    Completed,
    Failed,
    Cancelled,
}

impl ProgressKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: JobId,
    pub kind: ProgressKind,
    pub content: Option<String>,
    pub job: Job,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(JobId::generate(1, 0), "owner-1", "echo hi", 1)
    }

    #[test]
    fn lifecycle_sets_timestamps_once() {
        let mut job = job();
        assert!(job.start(10));
        assert!(!job.start(11));
        assert_eq!(job.started_at, Some(10));

        assert!(job.append_output("hi".to_string()));
        assert!(job.complete(20, "ignored because output exists"));
        assert_eq!(job.output, vec!["hi".to_string()]);
        assert_eq!(job.duration_ms(), Some(10));

        assert!(!job.cancel(30));
        assert!(!job.fail(30, "late".to_string()));
        assert_eq!(job.completed_at, Some(20));
        assert!(job.error.is_none());
    }

    #[test]
    fn final_result_fills_empty_output() {
        let mut job = job();
        job.start(1);
        job.complete(2, "final");
        assert_eq!(job.output, vec!["final".to_string()]);
    }

    #[test]
    fn joined_output_concatenates_fragments() {
        let mut job = job();
        job.start(1);
        job.append_output("warming up\n".to_string());
        job.append_output("Hello ".to_string());
        job.append_output("world".to_string());
        assert_eq!(job.joined_output(), "warming up\nHello world");
    }

    #[test]
    fn output_is_frozen_after_cancel() {
        let mut job = job();
        job.start(1);
        assert!(job.cancel(2));
        assert!(!job.append_output("late".to_string()));
        assert!(!job.complete(3, "late"));
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.output.is_empty());
    }

    #[test]
    fn only_running_jobs_can_fail() {
        let mut job = job();
        assert!(!job.fail(1, "too early".to_string()));
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.error.is_none());

        job.start(2);
        assert!(job.fail(3, "boom".to_string()));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.started_at, Some(2));
        assert_eq!(job.completed_at, Some(3));
    }

    #[test]
    fn status_classification() {
        assert!(JobStatus::Queued.is_active());
        assert!(JobStatus::Running.is_active());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert_eq!(JobStatus::Cancelled.to_string(), "cancelled");
    }
}
