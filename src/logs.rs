use anyhow::Result;
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    {ContentLimit, FileRotate},
};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs;
use std::path::Path;

pub const LOG_FILE_NAME: &str = "track-viz.log";

/// Log level for the number of `-v` flags given on the command line.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logs to stderr, and to a rotating file under `log_dir` when given.
pub fn init(level: LevelFilter, log_dir: Option<&Path>) -> Result<()> {
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if let Some(log_dir) = log_dir {
        fs::create_dir_all(log_dir)?;
        let log = FileRotate::new(
            log_dir.join(LOG_FILE_NAME),
            AppendTimestamp::default(FileLimit::MaxFiles(3)),
            ContentLimit::Lines(1000),
            Compression::None,
            #[cfg(unix)]
            None,
        );
        loggers.push(WriteLogger::new(level, config, log));
    }

    CombinedLogger::init(loggers)?;
    Ok(())
}
