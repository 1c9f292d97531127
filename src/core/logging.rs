use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Rolled daily as `helpdesk.log.YYYY-MM-DD`.
const LOG_FILE_PREFIX: &str = "helpdesk.log";

/// Quiets the per-statement sqlx logs and hyper's connection chatter.
const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn,hyper=warn";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn filter_from(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Routes `tracing` events to stdout and to a daily file under `log_dir`.
///
/// Call before anything else traces; a second call does nothing.
pub fn init(log_dir: &Path) {
    if FILE_GUARD.get().is_some() {
        return;
    }

    let file_writer = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX));
            let _ = FILE_GUARD.set(guard);
            Some(writer)
        }
        Err(err) => {
            eprintln!("Cannot create log dir {}: {}; logging to stdout only", log_dir.display(), err);
            None
        }
    };

    let rust_log = std::env::var("RUST_LOG").ok();
    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer)
    });

    let _ = tracing_subscriber::registry()
        .with(filter_from(rust_log.as_deref()))
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();
}
