//! Logger setup shared by the solver entry points.
use crate::errors::NexsysError;
use chrono::Local;
use simplelog::*;
use std::fs::File;

/// `"off"`/`"none"` disable logging (`Ok(None)`); otherwise the level filter to use.
pub fn parse_loglevel(level: &str) -> Result<Option<LevelFilter>, NexsysError> {
    let filter = match level.to_lowercase().as_str() {
        "off" | "none" => return Ok(None),
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        other => {
            return Err(NexsysError::Config(format!(
                "loglevel must be off, none, trace, debug, info, warn or error, found `{}`",
                other
            )));
        }
    };
    Ok(Some(filter))
}

/// Name of the log file written when file logging is on.
pub fn log_file_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("nexsys_log_{}.txt", date_and_time)
}

/// Initialises a terminal logger (plus a timestamped file logger when `to_file`).
/// Returns `true` when this call installed the logger; a logger installed earlier stays in place.
pub fn init_logger(loglevel: &str, to_file: bool) -> Result<bool, NexsysError> {
    let Some(log_option) = parse_loglevel(loglevel)? else {
        return Ok(false);
    };
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if to_file {
        let file = File::create(log_file_name())?;
        loggers.push(WriteLogger::new(log_option, Config::default(), file));
    }
    Ok(CombinedLogger::init(loggers).is_ok())
}
