//! Stderr logger for the command-line tool

use log::{LevelFilter, Log, Metadata, Record};

pub struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!(
                "[{level}][{target}] {message}",
                level = record.level(),
                target = record.target(),
                message = record.args()
            );
        }
    }

    fn flush(&self) {}
}

pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    static LOGGER: StderrLogger = StderrLogger;
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}
