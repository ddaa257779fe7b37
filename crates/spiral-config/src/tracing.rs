use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable naming a Chrome trace output file.
pub const CHROME_TRACE_ENV: &str = "SPIRAL_TRACE_CHROME";

static INITIALISED: OnceLock<()> = OnceLock::new();
static CHROME_GUARD: OnceLock<Mutex<Option<tracing_chrome::FlushGuard>>> = OnceLock::new();

/// Configures the global tracing subscriber.
///
/// Filtering follows `RUST_LOG` and defaults to `info`. When
/// `SPIRAL_TRACE_CHROME` points at a file, dispatch spans are also recorded
/// in Chrome's trace-event format.
pub fn init_tracing() -> Result<(), InitError> {
    init_with(chrome_trace_path)
}

/// The flag is only set once a subscriber is installed, so a failed attempt
/// can be retried.
fn init_with(
    chrome_path: impl FnOnce() -> Result<Option<PathBuf>, InitError>,
) -> Result<(), InitError> {
    if INITIALISED.get().is_some() {
        return Err(InitError::AlreadyInitialised);
    }

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stdout().is_terminal());

    let (chrome_layer, guard) = match chrome_path()? {
        Some(path) => {
            let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file(path)
                .include_args(true)
                .build();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(default_filter())
        .with(fmt_layer)
        .with(chrome_layer)
        .try_init()
        .map_err(|err| InitError::Subscriber(err.to_string()))?;

    if guard.is_some() {
        let slot = CHROME_GUARD.get_or_init(|| Mutex::new(None));
        if let Ok(mut slot) = slot.lock() {
            *slot = guard;
        }
    }
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)
}

/// Flushes the Chrome trace file, if one was opened by [`init_tracing`].
///
/// The writer lives in a static and is never dropped on its own, so callers
/// that enable `SPIRAL_TRACE_CHROME` should invoke this before exiting.
pub fn flush_chrome_trace() {
    if let Some(slot) = CHROME_GUARD.get() {
        if let Ok(mut slot) = slot.lock() {
            slot.take();
        }
    }
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn chrome_trace_path() -> Result<Option<PathBuf>, InitError> {
    match std::env::var(CHROME_TRACE_ENV) {
        Ok(raw) if !raw.trim().is_empty() => Ok(Some(PathBuf::from(raw))),
        Ok(_) => Ok(None),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(InitError::Env(err)),
    }
}

/// Errors emitted when configuring the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to read SPIRAL_TRACE_CHROME: {0}")]
    Env(std::env::VarError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}
