use std::{
    io::{
        Write,
        self
    }
};
use colored::{
    *
};
use log::{
    Record,
    Level
};
use pretty_env_logger::{
    env_logger::{
        fmt::{
            Formatter
        }
    }
};
use crate::{
    app_arguments::{
        VerboseLevel
    }
};

/// Info lines go without a prefix, they are the user facing output
fn level_prefix(level: Level) -> Option<ColoredString> {
    match level {
        Level::Info => None,
        Level::Debug => Some("DEBUG".green()),
        Level::Trace => Some("TRACE".blue()),
        Level::Warn => Some("WARN".yellow()),
        Level::Error => Some("ERROR".red())
    }
}

fn level_filter(verbose: &VerboseLevel) -> log::LevelFilter {
    match verbose {
        VerboseLevel::None => log::LevelFilter::Info,
        VerboseLevel::Medium => log::LevelFilter::Debug,
        VerboseLevel::Max => log::LevelFilter::Trace
    }
}

/// Logs go to stderr, stdout may carry the stream itself
pub fn setup_logs(verbose: &VerboseLevel){
    pretty_env_logger::formatted_builder()
        .format(|buf: &mut Formatter, rec: &Record| -> io::Result<()> {
            match level_prefix(rec.level()) {
                Some(prefix) => writeln!(buf, "{}: {}", prefix, rec.args()),
                None => writeln!(buf, "{}", rec.args())
            }
        })
        .target(pretty_env_logger::env_logger::Target::Stderr)
        .filter_module("hls_loader", level_filter(verbose))
        .init();
}
