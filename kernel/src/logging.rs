//! `log` backend writing colourised lines to the console.
//!
//! ```text
//! INFO [0042] [kestrel_kernel::task] message
//! ```
//!
//! The maximum level is fixed at build time through the `LOG` environment
//! variable (`ERROR`, `WARN`, `INFO`, `DEBUG`, `TRACE`); the default is `INFO`.

use core::sync::atomic::{AtomicUsize, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record};

struct KernelLogger;

/// Sequence number of the next record.
static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

impl Log for KernelLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        println!(
            "\u{1B}[{}m{:>5} [{:04}] [{}] {}\u{1B}[0m",
            level_to_color_code(record.level()),
            record.level(),
            seq,
            record.target(),
            record.args(),
        );
    }

    fn flush(&self) {}
}

fn level_to_color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31, // red
        Level::Warn => 93,  // bright yellow
        Level::Info => 34,  // blue
        Level::Debug => 32, // green
        Level::Trace => 90, // gray
    }
}

fn level_from_env() -> LevelFilter {
    match option_env!("LOG") {
        Some("ERROR") => LevelFilter::Error,
        Some("WARN") => LevelFilter::Warn,
        Some("DEBUG") => LevelFilter::Debug,
        Some("TRACE") => LevelFilter::Trace,
        Some("OFF") => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Install the logger. Records emitted before this are dropped.
pub fn init() {
    static LOGGER: KernelLogger = KernelLogger;
    // A second call finds the logger already set; nothing to do then.
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level_from_env());
    }
}
