use crate::app::command_support::{
    job_manager, load_settings, progress_line, require_access_token, runtime_log, CLI_OWNER,
};
use crate::engine::Engine;
use crate::jobs::{JobProgressEvent, ProgressKind};
use crate::translate::ChatTranslator;

pub fn cmd_ask(args: &[String]) -> Result<String, String> {
    let message = args.join(" ");
    if message.trim().is_empty() {
        return Err("usage: ask <message...>".to_string());
    }
    let token = require_access_token()?;

    let settings = load_settings()?;
    let log = runtime_log(&settings);
    let engine = Engine::new(
        ChatTranslator::new(&settings.translation, log.clone()),
        job_manager(&settings, &log),
        settings.engine.clone(),
        log,
    );

    let on_progress = |event: &JobProgressEvent| {
        if event.kind != ProgressKind::Output {
            eprintln!("{}", progress_line(event));
        }
    };
    let result = engine.process_message(CLI_OWNER, &token, &message, Some(&on_progress));
    Ok(result.messages.join("\n\n"))
}
