use std::{env, path::PathBuf, str::FromStr};

use tracing_subscriber::EnvFilter;

pub const LOGGER_LEVEL_ENV: &str = "AMF_REMOTING_LOGGER_LEVEL";
pub const LOGGER_FORMAT_ENV: &str = "AMF_REMOTING_LOGGER_FORMAT";
pub const LOG_FILE_ENV: &str = "AMF_REMOTING_LOG_FILE";
pub const LOG_FILE_LEVEL_ENV: &str = "AMF_REMOTING_LOG_FILE_LEVEL";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub logger: LoggerConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    /// `EnvFilter` directive for stdout.
    pub stdio_level: String,
    pub format: LoggerFormat,
    /// Optional JSON log file, recreated on every start.
    pub log_file: Option<PathBuf>,
    pub file_level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            stdio_level: "info".to_string(),
            format: LoggerFormat::Compact,
            log_file: None,
            file_level: "debug".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerFormat {
    Pretty,
    Json,
    Compact,
}

impl FromStr for LoggerFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(LoggerFormat::Pretty),
            "json" => Ok(LoggerFormat::Json),
            "compact" => Ok(LoggerFormat::Compact),
            _ => Err("Invalid logger format."),
        }
    }
}

pub fn read_config() -> Config {
    Config {
        logger: read_logger_config(|name| env::var(name).ok()),
    }
}

// Runs before the logger is installed, so problems are reported on stderr.
fn read_logger_config(var: impl Fn(&str) -> Option<String>) -> LoggerConfig {
    let default = LoggerConfig::default();

    let stdio_level = match var(LOGGER_LEVEL_ENV) {
        Some(level) => valid_filter(LOGGER_LEVEL_ENV, level).unwrap_or(default.stdio_level),
        None => default.stdio_level,
    };

    let format = match var(LOGGER_FORMAT_ENV) {
        Some(format) => LoggerFormat::from_str(&format).unwrap_or_else(|err| {
            eprintln!("{err} {LOGGER_FORMAT_ENV}={format:?}, using default.");
            default.format
        }),
        None => default.format,
    };

    let file_level = match var(LOG_FILE_LEVEL_ENV) {
        Some(level) => valid_filter(LOG_FILE_LEVEL_ENV, level).unwrap_or(default.file_level),
        None => default.file_level,
    };

    LoggerConfig {
        stdio_level,
        format,
        log_file: var(LOG_FILE_ENV)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from),
        file_level,
    }
}

fn valid_filter(env_name: &str, directive: String) -> Option<String> {
    match EnvFilter::try_new(&directive) {
        Ok(_) => Some(directive),
        Err(err) => {
            eprintln!("Invalid {env_name}={directive:?} ({err}), using default.");
            None
        }
    }
}
