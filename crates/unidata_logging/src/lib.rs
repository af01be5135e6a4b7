use core::{
    fmt::{self, Display, Arguments, Write as _},
    sync::atomic::{AtomicU8, self},
    time::Duration,
};
use std::{
    io::{self, Write},
    time::Instant,
};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock, const_mutex, const_rwlock};

static LOGGER : RwLock<Option<&'static Logger>> = const_rwlock(None);

// Used until `set_logger` is called
static DEFAULT_LOGGER : Logger = Logger::new();

static START : Lazy<Instant> = Lazy::new(Instant::now);

/// Install the global logger.
pub fn set_logger(logger: &'static Logger) {
    Lazy::force(&START);
    *LOGGER.write() = Some(logger);
}

/// Get the global logger, or the default console logger if none was set.
pub fn get_logger() -> &'static Logger {
    (*LOGGER.read()).unwrap_or(&DEFAULT_LOGGER)
}

/// Time elapsed since the logger was installed (or since the first log).
pub fn get_timestamp() -> Duration {
    START.elapsed()
}

/// Logging level
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum LogLevel {
    /// Severe error: the run cannot continue
    Severe,
    /// Error: something failed, but the run might still continue
    Error,
    /// Warning: input that was tolerated, but probably is not what was intended
    Warning,
    /// General info
    Info,
    /// Verbose info
    Verbose,
    /// Debug info (includes verbose info)
    Debug,
}

impl LogLevel {
    /// Parse a level from its lowercase name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "severe"  => Some(Self::Severe),
            "error"   => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "info"    => Some(Self::Info),
            "verbose" => Some(Self::Verbose),
            "debug"   => Some(Self::Debug),
            _         => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            0 => Self::Severe,
            1 => Self::Error,
            2 => Self::Warning,
            3 => Self::Info,
            4 => Self::Verbose,
            _ => Self::Debug,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Severe  => f.write_str("\x1B[1m\x1B[41m\x1B[30m[SEVERE ]\x1B[0m"),
            LogLevel::Error   => f.write_str(               "\x1B[91m[ERROR  ]\x1B[0m"),
            LogLevel::Warning => f.write_str(               "\x1B[93m[WARNING]\x1B[0m"),
            LogLevel::Info    => f.write_str(               "\x1B[37m[INFO   ]\x1B[0m"),
            LogLevel::Verbose => f.write_str(               "\x1B[90m[VERBOSE]\x1B[0m"),
            LogLevel::Debug   => f.write_str(               "\x1B[94m[DEBUG  ]\x1B[0m"),
        }
    }
}

/// Log category
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LogCategory {
    category     : &'static str,
    sub_category : Option<&'static str>
}

impl LogCategory {
    pub const fn new(name: &'static str) -> Self {
        Self { category: name, sub_category: None }
    }

    pub const fn new_with_sub(name: &'static str, sub_name: &'static str) -> Self {
        Self { category: name, sub_category: Some(sub_name) }
    }
}

impl Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_category {
            Some(sub) => write!(f, "{}({sub})", self.category),
            None => f.write_str(self.category),
        }
    }
}

/// Additional info about where the log occured
pub struct LogLocation {
    file : &'static str,
    line : u32,
    func : &'static str,
    time : Duration,
}

impl LogLocation {
    /// Creates a new log location
    pub const fn new(file: &'static str, line: u32, func: &'static str, time: Duration) -> Self {
        Self { file, line, func, time }
    }

    /// Get the file name where the log occured
    pub const fn file(&self) -> &str {
        self.file
    }

    /// Get the line where the log occurred
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Get the function where the log occurred
    pub const fn function(&self) -> &str {
        self.func
    }

    /// Get the time since the logger started
    pub const fn timestamp(&self) -> Duration {
        self.time
    }
}

struct LogLocationFormatter<'a> {
    loc   : &'a LogLocation,
    level : LogLevel
}

impl Display for LogLocationFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            LogLevel::Severe |
            LogLevel::Error |
            LogLevel::Debug => write!(f, "({}:{}: {}) ", self.loc.file(), self.loc.line(), self.loc.function()),
            LogLevel::Warning |
            LogLevel::Info |
            LogLevel::Verbose => Ok(()),
        }
    }
}

pub fn get_func_name<F>(_: F) -> &'static str {
    core::any::type_name::<F>()
}

#[macro_export]
macro_rules! log_location {
    () => {
        $crate::LogLocation::new(file!(), line!(), "", $crate::get_timestamp())
    };
    ($func: expr) => {
        $crate::LogLocation::new(file!(), line!(), $crate::get_func_name($func), $crate::get_timestamp())
    };
}

struct LoggerState {
    writers:        [Option<Box<dyn Write + Send>>; Self::MAX_WRITERS],
    cache:          String,
    always_flush:   bool,
    log_to_console: bool,
}

impl LoggerState {
    const MAX_WRITERS: usize = 8;
    const CACHE_FLUSH_LIMIT: usize = 4 * 1024;

    const fn new() -> Self {
        // `Option<Box<_>>` is not `Copy`, so the array is built from a const item
        const NONE: Option<Box<dyn Write + Send>> = None;

        Self {
            writers: [NONE; Self::MAX_WRITERS],
            cache: String::new(),
            always_flush: false,
            log_to_console: true,
        }
    }

    fn format_message(&mut self, fmt_args: Arguments) {
        _ = self.cache.write_fmt(fmt_args);
    }

    fn flush_when_needed(&mut self) {
        if self.always_flush || self.cache.len() > Self::CACHE_FLUSH_LIMIT {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.cache.is_empty() {
            return;
        }

        if self.log_to_console {
            _ = io::stderr().write_all(self.cache.as_bytes());
        }

        for writer in self.writers.iter_mut().flatten() {
            _ = writer.write_all(self.cache.as_bytes());
            _ = writer.flush();
        }
        self.cache.clear();
    }
}

/// Logger
///
/// Writes to the console and up to 8 additional writers, e.g. a log file
pub struct Logger {
    state: Mutex<LoggerState>,
    max_log_level: AtomicU8,
}

impl Logger {
    pub const fn new() -> Self {
        Self {
            state: const_mutex(LoggerState::new()),
            max_log_level: AtomicU8::new(LogLevel::Info as u8),
        }
    }

    /// Set the maximum log level (severe == lowest, debug == highest)
    pub fn set_max_level(&self, level: LogLevel) {
        self.max_log_level.store(level as u8, atomic::Ordering::Relaxed)
    }

    /// Get the maximum log level
    pub fn max_level(&self) -> LogLevel {
        LogLevel::from_u8(self.max_log_level.load(atomic::Ordering::Relaxed))
    }

    /// Check if a message at `level` would be written
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level as u8 <= self.max_log_level.load(atomic::Ordering::Relaxed)
    }

    /// Set whether the logger should flush after each write
    pub fn set_always_flush(&self, always_flush: bool) {
        self.state.lock().always_flush = always_flush;
    }

    /// Set whether the logger should log it's output to console
    pub fn set_log_to_console(&self, log_to_console: bool) {
        let mut state = self.state.lock();

        // Everything logged before the change still goes where it was meant to go
        state.flush();
        state.log_to_console = log_to_console;
    }

    /// Add a writer.
    ///
    /// Returns `Ok(index)` if space was available. This index can be used to remove the writer later on.
    ///
    /// Otherwise returns an `Err` with the provided writer
    pub fn add_writer(&self, writer: Box<dyn Write + Send>) -> Result<usize, Box<dyn Write + Send>> {
        let mut state = self.state.lock();

        let empty = state.writers.iter_mut().enumerate().find(|val| val.1.is_none());
        match empty {
            Some((id, slot)) => {
                *slot = Some(writer);
                Ok(id)
            },
            None => Err(writer),
        }
    }

    /// Remove a writer from the logger
    pub fn remove_writer(&self, index: usize) -> Option<Box<dyn Write + Send>> {
        let mut state = self.state.lock();
        state.flush();
        state.writers.get_mut(index).and_then(Option::take)
    }

    /// Log a message
    pub fn log(&self, category: LogCategory, level: LogLevel, loc: LogLocation, text: &str) {
        self.log_fmt(category, level, loc, format_args!("{text}"));
    }

    pub fn log_fmt(&self, category: LogCategory, level: LogLevel, loc: LogLocation, format: Arguments) {
        if !self.is_enabled(level) {
            return;
        }

        let loc_formatter = LogLocationFormatter { loc: &loc, level };
        let timestamp = loc.timestamp().as_secs_f64();
        let mut state = self.state.lock();
        state.format_message(format_args!("\x1B[38m[{timestamp:>9.3}]\x1B[0m {level} [{category}] {loc_formatter}"));
        state.format_message(format);
        state.cache.push('\n');
        // Errors are written out immediately
        if level <= LogLevel::Error {
            state.flush();
        } else {
            state.flush_when_needed();
        }
    }

    pub fn flush(&self) {
        self.state.lock().flush()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.flush();
    }
}

#[macro_export]
macro_rules! log {
    ($category:expr, $level:expr, $func:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $level, $crate::log_location!($func), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_severe {
    ($category:expr, $func:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Severe, $crate::log_location!($func), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_error {
    ($category:expr, $func:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Error, $crate::log_location!($func), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($category:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Warning, $crate::log_location!(), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_info {
    ($category:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Info, $crate::log_location!(), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_verbose {
    ($category:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Verbose, $crate::log_location!(), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($category:expr, $func:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Debug, $crate::log_location!($func), format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use super::*;

    const LOG_CAT : LogCategory = LogCategory::new_with_sub("Test", "Logger");

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    fn quiet_logger() -> (Logger, SharedBuffer) {
        let logger = Logger::new();
        logger.set_log_to_console(false);
        logger.set_always_flush(true);
        let buffer = SharedBuffer::default();
        assert!(logger.add_writer(Box::new(buffer.clone())).is_ok());
        (logger, buffer)
    }

    #[test]
    fn writes_level_category_and_message() {
        let (logger, buffer) = quiet_logger();
        let count = 3;
        logger.log_fmt(LOG_CAT, LogLevel::Info, log_location!(), format_args!("counted {count} strings"));

        let text = buffer.contents();
        assert!(text.contains("[INFO   ]"));
        assert!(text.contains("[Test(Logger)]"));
        assert!(text.ends_with("counted 3 strings\n"));
    }

    #[test]
    fn filters_above_max_level() {
        let (logger, buffer) = quiet_logger();
        logger.set_max_level(LogLevel::Warning);
        logger.log(LOG_CAT, LogLevel::Verbose, log_location!(), "hidden");
        logger.log(LOG_CAT, LogLevel::Warning, log_location!(), "shown");

        let text = buffer.contents();
        assert!(!text.contains("hidden"));
        assert!(text.contains("shown"));
        assert_eq!(logger.max_level(), LogLevel::Warning);
    }

    #[test]
    fn errors_include_location() {
        let (logger, buffer) = quiet_logger();
        logger.log(LOG_CAT, LogLevel::Error, log_location!(errors_include_location), "broken");

        let text = buffer.contents();
        assert!(text.contains(file!()));
        assert!(text.contains("errors_include_location"));
    }

    #[test]
    fn caches_until_flushed() {
        let logger = Logger::new();
        logger.set_log_to_console(false);
        let buffer = SharedBuffer::default();
        assert!(logger.add_writer(Box::new(buffer.clone())).is_ok());

        logger.log(LOG_CAT, LogLevel::Info, log_location!(), "pending");
        assert!(buffer.contents().is_empty());
        logger.flush();
        assert!(buffer.contents().contains("pending"));
    }

    #[test]
    fn writer_slots_are_limited() {
        let logger = Logger::new();
        for _ in 0..LoggerState::MAX_WRITERS {
            assert!(logger.add_writer(Box::new(io::sink())).is_ok());
        }
        assert!(logger.add_writer(Box::new(io::sink())).is_err());
        assert!(logger.remove_writer(2).is_some());
        assert_eq!(logger.add_writer(Box::new(io::sink())).ok(), Some(2));
    }

    #[test]
    fn parses_level_names() {
        assert_eq!(LogLevel::parse("verbose"), Some(LogLevel::Verbose));
        assert_eq!(LogLevel::parse("loud"), None);
    }
}
