//! Logging and error reporting.
//!
//! The TUI owns the terminal, so all log output goes to a daily-rolling JSON
//! file under the data directory. `log` macros are bridged into `tracing`.
//! Fatal startup errors are reported through miette once the terminal has
//! been restored.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use miette::Diagnostic;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// File name prefix of the rolling log.
pub const LOG_FILE_PREFIX: &str = "bookhub.log";

const DEFAULT_FILTER: &str = "info";

/// Initialize file logging in `log_dir`.
///
/// The returned guard must stay alive for the lifetime of the process so
/// buffered lines are flushed on shutdown.
pub fn init(log_dir: &Path) -> WorkerGuard {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("Failed to create log directory {}: {e}", log_dir.display());
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // No stdout layer: the terminal belongs to ratatui.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_filter(env_filter);

    // try_init also installs the `log` bridge.
    if let Err(e) = tracing_subscriber::registry().with(file_layer).try_init() {
        eprintln!("Failed to initialize tracing: {e}");
    }

    init_miette();

    let dir = log_dir.to_path_buf();
    std::thread::spawn(move || {
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        compress_old_logs(&dir, &today);
    });

    log::info!(
        "Logging initialized. Writing to {} (daily rolling)",
        log_dir.join(LOG_FILE_PREFIX).display()
    );

    guard
}

/// Gzip rolled log files other than `today`'s. Returns the compressed paths.
pub fn compress_old_logs(log_dir: &Path, today: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return Vec::new();
    };

    let mut compressed = Vec::new();
    for path in entries.flatten().map(|entry| entry.path()) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let rolled = name
            .strip_prefix(LOG_FILE_PREFIX)
            .and_then(|rest| rest.strip_prefix('.'));
        let Some(date) = rolled else { continue };
        if date == today || date.ends_with(".gz") {
            continue;
        }

        match compress_file(&path) {
            Ok(gz_path) => {
                log::info!("Compressed old log {}", path.display());
                compressed.push(gz_path);
            }
            Err(e) => log::warn!("Failed to compress old log {}: {e}", path.display()),
        }
    }
    compressed
}

fn compress_file(path: &Path) -> io::Result<PathBuf> {
    let mut gz_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "No filename"))?
        .to_os_string();
    gz_name.push(".gz");
    let gz_path = path.with_file_name(gz_name);

    if gz_path.exists() {
        return Ok(gz_path);
    }

    let mut reader = io::BufReader::new(fs::File::open(path)?);
    let mut encoder = GzEncoder::new(fs::File::create(&gz_path)?, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;
    fs::remove_file(path)?;

    Ok(gz_path)
}

fn init_miette() {
    let interactive = io::stderr().is_terminal();
    let unicode = std::env::var("LANG")
        .map(|l| l.contains("UTF-8") || l.contains("utf8"))
        .unwrap_or(true);

    let result = miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .unicode(unicode)
                .color(interactive)
                .context_lines(2)
                .break_words(true)
                .build(),
        )
    }));
    if result.is_err() {
        log::debug!("miette hook already installed");
    }
}

/// Fatal error surfaced before or after the TUI runs.
#[derive(Debug, Error, Diagnostic)]
pub enum StartupError {
    #[error("Could not reach the exchange service at {url}")]
    #[diagnostic(
        code(bookhub::api_unreachable),
        help("Set api.base_url in the config file or the BOOKHUB_API_URL environment variable")
    )]
    Api {
        url: String,
        #[source]
        source: super::error::ApiError,
    },

    #[error("Terminal error: {0}")]
    #[diagnostic(code(bookhub::terminal))]
    Terminal(#[from] io::Error),
}
