//! User-facing notifications behind a trait so commands stay testable.

use log::{error, info};

pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn info(&self, message: &str);
}

/// Prints to stdout/stderr for interactive runs.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("{message}");
    }

    fn info(&self, message: &str) {
        println!("{message}");
    }
}

/// Routes everything into the log stream, for non-interactive use.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, message: &str) {
        info!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }

    fn info(&self, message: &str) {
        info!("{message}");
    }
}
