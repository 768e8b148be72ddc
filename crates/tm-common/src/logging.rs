use std::env;
use std::panic;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

// Keeps the non-blocking file writer flushing for the life of the process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_flag(name: &str) -> bool {
    match env::var(name) {
        Ok(value) => value == "1" || value.eq_ignore_ascii_case("true"),
        Err(_) => false,
    }
}

/// Route panics through `tracing` so they land in the same sink as regular
/// logs. Installs at most one hook per process; repeat calls are no-ops.
/// Set `TM_LOG_INCLUDE_BACKTRACE=1` to also run the default hook.
pub fn install_tracing_panic_hook(app_name: &'static str) {
    static HOOK_SET: OnceLock<()> = OnceLock::new();
    if HOOK_SET.set(()).is_err() {
        return;
    }

    let previous = panic::take_hook();
    let forward_backtrace = env_flag("TM_LOG_INCLUDE_BACKTRACE");

    panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let message = match payload.downcast_ref::<&str>() {
            Some(text) => (*text).to_string(),
            None => payload
                .downcast_ref::<String>()
                .cloned()
                .unwrap_or_else(|| "non-string panic payload".into()),
        };

        let location = match info.location() {
            Some(loc) => format!("{}:{}:{}", loc.file(), loc.line(), loc.column()),
            None => "unknown".into(),
        };

        let thread = std::thread::current();

        tracing::error!(
            application = app_name,
            thread_name = thread.name().unwrap_or("unnamed"),
            %location,
            panic_message = %message,
            "panic captured"
        );

        if forward_backtrace {
            previous(info);
        }
    }));
}

fn file_writer(app_name: &str) -> Option<BoxMakeWriter> {
    let dir = PathBuf::from(env::var_os("TM_LOG_DIR")?);
    if let Err(err) = std::fs::create_dir_all(&dir) {
        tracing::warn!(error = %err, "cannot create TM_LOG_DIR, logging to stdout");
        return None;
    }

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
        dir,
        format!("{app_name}.log"),
    ));
    let _ = FILE_GUARD.set(guard);
    Some(BoxMakeWriter::new(writer))
}

/// Initialize the global subscriber. Logs go to a daily-rotated file under
/// `TM_LOG_DIR` when that variable is set, otherwise to stdout. `RUST_LOG`
/// controls filtering and defaults to `info`.
pub fn init_tracing_subscriber(app_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match file_writer(app_name) {
        Some(writer) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        }
    }
}
