pub mod events;
pub mod manager;
pub mod types;

pub use manager::{JobManager, Subscription, DEFAULT_RECENT_LIMIT};
pub use types::{Job, JobProgressEvent, JobStatus, ProgressKind};
