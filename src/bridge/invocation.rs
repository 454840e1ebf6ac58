use crate::bridge::{ExecuteOptions, InvocationSpec};

pub fn build_invocation(binary: &str, options: &ExecuteOptions) -> InvocationSpec {
    let mut args = vec![
        "--print".to_string(),
        "--verbose".to_string(),
        "--output-format".to_string(),
        "stream-json".to_string(),
        "--dangerously-skip-permissions".to_string(),
    ];
    if !options.allowed_tools.is_empty() {
        args.push("--allowedTools".to_string());
        args.push(options.allowed_tools.join(","));
    }
    if let Some(extra) = options
        .append_system_prompt
        .as_ref()
        .filter(|extra| !extra.trim().is_empty())
    {
        args.push("--append-system-prompt".to_string());
        args.push(extra.clone());
    }
    InvocationSpec {
        binary: binary.to_string(),
        args,
    }
}
