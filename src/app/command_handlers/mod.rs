use crate::app::cli::{help_text, parse_cli_verb, CliVerb};

pub mod ask;
pub mod config;
pub mod doctor;
pub mod exec;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Doctor => doctor::cmd_doctor(),
        CliVerb::Exec => exec::cmd_exec(&args[1..]),
        CliVerb::Ask => ask::cmd_ask(&args[1..]),
        CliVerb::Config => config::cmd_config(),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}
