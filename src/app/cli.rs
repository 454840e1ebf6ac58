#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Doctor,
    Exec,
    Ask,
    Config,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "doctor" => CliVerb::Doctor,
        "exec" => CliVerb::Exec,
        "ask" => CliVerb::Ask,
        "config" => CliVerb::Config,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  doctor                               Check config, bridge binary and credentials"
            .to_string(),
        "  exec <prompt...>                     Run a prompt as a job and print its output"
            .to_string(),
        "  ask <message...>                     Translate, execute and summarize a request"
            .to_string(),
        "  config                               Print the effective configuration".to_string(),
        "  help                                 Show this help".to_string(),
        String::new(),
        "Environment:".to_string(),
        "  ADEGATE_CONFIG                       Config file (default ~/.adegate/config.yaml)"
            .to_string(),
        "  ADEGATE_ACCESS_TOKEN                 Bearer token for the translation service"
            .to_string(),
        "  ADEGATE_TRANSLATION_API_BASE         Override translation.api_base".to_string(),
        "  ADEGATE_LOG_LEVEL                    Override logging.level".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_parse_and_unknown_falls_through() {
        assert_eq!(parse_cli_verb("exec"), CliVerb::Exec);
        assert_eq!(parse_cli_verb("--help"), CliVerb::Help);
        assert_eq!(parse_cli_verb("start"), CliVerb::Unknown);
    }

    #[test]
    fn help_lists_every_verb() {
        let help = help_text();
        for verb in ["doctor", "exec", "ask", "config", "help"] {
            assert!(help.contains(&format!("  {verb}")), "missing {verb}");
        }
    }
}
