use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{self, Write};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

struct QuillLogger;

static LOGGER: QuillLogger = QuillLogger;
static LOGGING_ENABLED: std::sync::LazyLock<Mutex<bool>> =
    std::sync::LazyLock::new(|| Mutex::new(false));
static LOG_FILE: std::sync::LazyLock<Mutex<Option<std::fs::File>>> =
    std::sync::LazyLock::new(|| Mutex::new(None));
static LOG_TO_STDOUT: std::sync::LazyLock<Mutex<bool>> =
    std::sync::LazyLock::new(|| Mutex::new(false));
static VERBOSE_LOGGING: std::sync::LazyLock<Mutex<bool>> =
    std::sync::LazyLock::new(|| Mutex::new(false));

/// Tracing writer that only ever appends to the configured log file
#[derive(Clone)]
struct FileWriter;

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(file) = LOG_FILE.lock().as_mut() {
            let _ = file.write_all(buf);
            let _ = file.flush();
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = LOG_FILE.lock().as_mut() {
            let _ = file.flush();
        }
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FileWriter {
    type Writer = FileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        FileWriter
    }
}

/// Returns true for targets of HTTP plumbing that floods debug output
fn is_noisy_target(target: &str) -> bool {
    ["reqwest", "hyper", "h2", "rustls", "want", "mio", "tokio_util"]
        .iter()
        .any(|prefix| target.starts_with(prefix))
}

impl log::Log for QuillLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if !*LOGGING_ENABLED.lock() {
            return false;
        }

        if metadata.target().starts_with("git_quill") {
            return metadata.level() <= Level::Debug;
        }

        if !*VERBOSE_LOGGING.lock() && is_noisy_target(metadata.target()) {
            return false;
        }

        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let message = format!(
                "{} {} [{}] - {}\n",
                timestamp,
                record.level(),
                record.target(),
                record.args()
            );

            if let Some(file) = LOG_FILE.lock().as_mut() {
                let _ = file.write_all(message.as_bytes());
                let _ = file.flush();
            }

            if *LOG_TO_STDOUT.lock() {
                print!("{message}");
            }
        }
    }

    fn flush(&self) {}
}

/// Initialize the `log` facade and the `tracing` subscriber.
///
/// Safe to call more than once; only the first call installs anything and
/// every later call returns the first call's outcome.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::{Once, OnceLock};
    static INIT: Once = Once::new();
    static INIT_RESULT: OnceLock<Result<(), String>> = OnceLock::new();

    INIT.call_once(|| {
        let verbose_from_env = std::env::var("GIT_QUILL_VERBOSE").is_ok()
            || std::env::var("RUST_LOG").is_ok_and(|v| v.contains("debug") || v.contains("trace"));

        if verbose_from_env {
            set_verbose_logging(true);
        }

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "git_quill=debug,warn".into());

        let fmt_layer = fmt::Layer::new()
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(FileWriter);

        let tracing_result = Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();

        let log_result = log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Debug));

        let result = match (tracing_result, log_result) {
            (Ok(()), Ok(()) | Err(_)) | (Err(_), Ok(())) => Ok(()),
            (Err(tracing_err), Err(log_err)) => Err(format!(
                "Failed to initialize logging: tracing={tracing_err}, log={log_err}"
            )),
        };

        let _ = INIT_RESULT.set(result);
    });

    match INIT_RESULT.get() {
        Some(Ok(())) => Ok(()),
        Some(Err(e)) => Err(e.clone().into()),
        None => Err("Initialization failed unexpectedly".into()),
    }
}

pub fn enable_logging() {
    *LOGGING_ENABLED.lock() = true;
}

pub fn disable_logging() {
    *LOGGING_ENABLED.lock() = false;
}

pub fn set_verbose_logging(enabled: bool) {
    *VERBOSE_LOGGING.lock() = enabled;
}

pub fn set_log_file(file_path: &str) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;

    *LOG_FILE.lock() = Some(file);
    Ok(())
}

pub fn set_log_to_stdout(enabled: bool) {
    *LOG_TO_STDOUT.lock() = enabled;
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! trace_debug {
    (target: $target:expr, $($arg:tt)*) => {
        tracing::debug!(target: $target, $($arg)*)
    };
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! trace_info {
    (target: $target:expr, $($arg:tt)*) => {
        tracing::info!(target: $target, $($arg)*)
    };
    ($($arg:tt)*) => {
        tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! trace_warn {
    (target: $target:expr, $($arg:tt)*) => {
        tracing::warn!(target: $target, $($arg)*)
    };
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}
