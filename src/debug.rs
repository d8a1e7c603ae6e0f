use parking_lot::Mutex;
/// Debugging infrastructure for career-chat
///
/// Controlled by DEBUG_LEVEL environment variable:
/// - 0 or unset: No debugging
/// - 1: Errors only
/// - 2: Info level (engine acquisition, placement fill-in)
/// - 3: Debug level (segmentation, rendering decisions)
/// - 4: Trace level (every run, every pointer event)
///
/// All output goes to `career_chat_debug.log` in the platform temp directory.
/// Keeping debug output out of stdout means `career-chat render` and
/// `career-chat inspect` can be piped without log noise.
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Debug level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl DebugLevel {
    fn from_env() -> Self {
        match std::env::var("DEBUG_LEVEL") {
            Ok(val) => match val.trim().parse::<u8>() {
                Ok(1) => DebugLevel::Error,
                Ok(2) => DebugLevel::Info,
                Ok(3) => DebugLevel::Debug,
                Ok(4) => DebugLevel::Trace,
                _ => DebugLevel::Off,
            },
            Err(_) => DebugLevel::Off,
        }
    }

    fn from_log_filter(filter: log::LevelFilter) -> Self {
        match filter {
            log::LevelFilter::Off => DebugLevel::Off,
            log::LevelFilter::Error | log::LevelFilter::Warn => DebugLevel::Error,
            log::LevelFilter::Info => DebugLevel::Info,
            log::LevelFilter::Debug => DebugLevel::Debug,
            log::LevelFilter::Trace => DebugLevel::Trace,
        }
    }

    fn to_log_filter(self) -> log::LevelFilter {
        match self {
            DebugLevel::Off => log::LevelFilter::Off,
            DebugLevel::Error => log::LevelFilter::Error,
            DebugLevel::Info => log::LevelFilter::Info,
            DebugLevel::Debug => log::LevelFilter::Debug,
            DebugLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Location of the debug log file.
pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("career_chat_debug.log")
}

/// Global debug logger
struct DebugLogger {
    level: DebugLevel,
    file: Option<std::fs::File>,
    mirror_stderr: bool,
}

impl DebugLogger {
    fn new() -> Self {
        let mut logger = DebugLogger {
            level: DebugLevel::Off,
            file: None,
            mirror_stderr: false,
        };
        logger.set_level(DebugLevel::from_env());
        logger
    }

    fn set_level(&mut self, level: DebugLevel) {
        self.level = level;
        if level == DebugLevel::Off || self.file.is_some() {
            return;
        }

        // Silently skip file logging if the log file can't be opened; debug
        // output must never interfere with the command's own output.
        if let Ok(f) = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(log_path())
        {
            self.file = Some(f);
            self.write_raw(&format!(
                "\n{}\ncareer-chat debug session started at {} (level={:?})\n{}\n",
                "=".repeat(80),
                get_timestamp(),
                level,
                "=".repeat(80)
            ));
        }
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.file {
            let _ = file.write_all(msg.as_bytes());
            let _ = file.flush();
        }
    }

    fn log(&mut self, level: DebugLevel, category: &str, msg: &str) {
        if level <= self.level {
            let timestamp = get_timestamp();
            let level_str = match level {
                DebugLevel::Error => "ERROR",
                DebugLevel::Info => "INFO ",
                DebugLevel::Debug => "DEBUG",
                DebugLevel::Trace => "TRACE",
                DebugLevel::Off => return,
            };
            let line = format!("[{}] [{}] [{}] {}\n", timestamp, level_str, category, msg);
            if self.mirror_stderr {
                eprint!("{line}");
            }
            self.write_raw(&line);
        }
    }
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

fn get_logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::new()))
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Check if debugging is enabled at given level
pub fn is_enabled(level: DebugLevel) -> bool {
    let logger = get_logger().lock();
    level <= logger.level
}

/// Log a message at specified level
pub fn log(level: DebugLevel, category: &str, msg: &str) {
    let mut logger = get_logger().lock();
    logger.log(level, category, msg);
}

/// Log formatted message
pub fn logf(level: DebugLevel, category: &str, args: fmt::Arguments) {
    if is_enabled(level) {
        log(level, category, &format!("{}", args));
    }
}

// ---------------------------------------------------------------------------
// `log` crate bridge
// ---------------------------------------------------------------------------

/// Routes `log::info!()` and friends into the debug log file.
struct LogBridge;

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            log::Level::Error | log::Level::Warn => DebugLevel::Error,
            log::Level::Info => DebugLevel::Info,
            log::Level::Debug => DebugLevel::Debug,
            log::Level::Trace => DebugLevel::Trace,
        };
        log(level, record.target(), &record.args().to_string());
    }

    fn flush(&self) {}
}

static LOG_BRIDGE: LogBridge = LogBridge;

/// Install the `log` bridge.
///
/// Precedence: explicit `level` (CLI `--log-level`), then `DEBUG_LEVEL`.
/// When `RUST_LOG` is set, records are mirrored to stderr as well.
/// Calling this more than once only updates the level.
pub fn init_log_bridge(level: Option<log::LevelFilter>) {
    let mut logger = get_logger().lock();
    if let Some(filter) = level {
        logger.set_level(DebugLevel::from_log_filter(filter));
    }
    logger.mirror_stderr = std::env::var_os("RUST_LOG").is_some();
    let filter = logger.level.to_log_filter();
    drop(logger);

    let _ = log::set_logger(&LOG_BRIDGE);
    log::set_max_level(filter);
}

// Convenience macros for logging
#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Error, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Info, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Debug, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_trace {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Trace, $category, format_args!($($arg)*))
    };
}
