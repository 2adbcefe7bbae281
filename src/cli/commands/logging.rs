use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Accepts either a count (0-5) or a level name.
#[must_use]
pub fn log_level_parser() -> ValueParser {
    ValueParser::from(|value: &str| -> Result<u8, String> {
        if let Ok(count) = value.parse::<u8>() {
            if count <= 5 {
                return Ok(count);
            }
            return Err(format!("verbosity {count} is out of range (max 5)"));
        }
        match value.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            other => Err(format!("unknown log level: {other}")),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("ZAGUAN_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(log_level_parser()),
    )
}
