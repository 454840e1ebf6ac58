use crate::app::command_support::{
    job_manager, load_settings, progress_line, runtime_log, CLI_OWNER,
};
use crate::jobs::JobStatus;

pub fn cmd_exec(args: &[String]) -> Result<String, String> {
    let prompt = args.join(" ");
    if prompt.trim().is_empty() {
        return Err("usage: exec <prompt...>".to_string());
    }

    let settings = load_settings()?;
    let log = runtime_log(&settings);
    let manager = job_manager(&settings, &log);

    let (job, subscription) = manager.create_job_subscribed(CLI_OWNER, &prompt);
    let mut finished = None;
    for event in subscription.iter() {
        eprintln!("{}", progress_line(&event));
        if event.kind.is_terminal() {
            finished = Some(event.job);
            break;
        }
    }
    let job = finished
        .or_else(|| manager.wait_for_job(job.id.as_str(), None))
        .ok_or_else(|| format!("job {} disappeared before finishing", job.id))?;

    match job.status {
        JobStatus::Completed => Ok(job.joined_output()),
        JobStatus::Failed => Err(format!(
            "job {} failed: {}",
            job.id,
            job.error.as_deref().unwrap_or("unknown error")
        )),
        status => Err(format!("job {} ended as {status}", job.id)),
    }
}
