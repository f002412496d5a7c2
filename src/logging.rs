use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

const DEFAULT_LOG_FILTER: &str = "warn,ask=info";
const DEFAULT_LOG_FILE_PATH: &str = "logs/ask.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

type InitResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogOutput {
    Stderr,
    File,
    Both,
}

/// Logging knobs read from the environment: LOG_FORMAT (pretty|json),
/// LOG_OUTPUT (stderr|file|both), LOG_FILE_PATH.
#[derive(Debug, PartialEq, Eq)]
struct LogSettings {
    format: LogFormat,
    output: LogOutput,
    file_path: PathBuf,
}

impl LogSettings {
    fn from_env() -> Self {
        Self::from_vars(
            env::var("LOG_FORMAT").ok().as_deref(),
            env::var("LOG_OUTPUT").ok().as_deref(),
            env::var("LOG_FILE_PATH").ok().as_deref(),
        )
    }

    fn from_vars(format: Option<&str>, output: Option<&str>, file_path: Option<&str>) -> Self {
        let format = match format.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        let output = match output.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("file") => LogOutput::File,
            Some("both") => LogOutput::Both,
            _ => LogOutput::Stderr,
        };
        let file_path = file_path
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE_PATH));

        Self {
            format,
            output,
            file_path,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_with_writer(format: LogFormat, writer: BoxMakeWriter) -> InitResult {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(writer)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .with_writer(writer)
            .try_init(),
    }
}

fn build_file_writer(path: &Path) -> std::io::Result<(non_blocking::NonBlocking, WorkerGuard)> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| std::ffi::OsStr::new("ask.log"));

    fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

fn init_from_settings(settings: &LogSettings) -> InitResult {
    let stderr_writer = || BoxMakeWriter::new(std::io::stderr);

    match settings.output {
        LogOutput::Stderr => init_with_writer(settings.format, stderr_writer()),
        LogOutput::File | LogOutput::Both => {
            let include_stderr = settings.output == LogOutput::Both;
            match build_file_writer(&settings.file_path) {
                Ok((file_writer, guard)) => {
                    let writer = if include_stderr {
                        BoxMakeWriter::new(std::io::stderr.and(file_writer))
                    } else {
                        BoxMakeWriter::new(file_writer)
                    };
                    let result = init_with_writer(settings.format, writer);
                    if result.is_ok() {
                        let _ = LOG_GUARD.set(guard);
                    }
                    result
                }
                Err(err) => {
                    let mode = if include_stderr { "both" } else { "file" };
                    eprintln!(
                        "ask: failed to initialize LOG_OUTPUT={} at '{}': {}; using stderr instead",
                        mode,
                        settings.file_path.display(),
                        err
                    );
                    init_with_writer(settings.format, stderr_writer())
                }
            }
        }
    }
}

pub fn init() {
    let _ = init_from_settings(&LogSettings::from_env());
}
