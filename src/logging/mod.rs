use slog::{o, Drain, Logger};
use slog_async::Async;
use slog_term::{FullFormat, PlainDecorator, TermDecorator};

/// Configuration for setting up the logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub async_buffer_size: usize,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            async_buffer_size: 1024,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Uncolored output, suitable for log files and CI
    pub fn plain() -> Self {
        Self {
            use_color: false,
            ..Default::default()
        }
    }
}

/// Sets up the audit logger with configurable options
pub fn setup_logger(config: LoggerConfig) -> Logger {
    let decorator = {
        let builder = TermDecorator::new();
        let builder = if config.use_color {
            builder.force_color()
        } else {
            builder
        };
        builder.build()
    };

    let drain = FullFormat::new(decorator).build().fuse();

    let drain = Async::new(drain)
        .chan_size(config.async_buffer_size)
        .build()
        .fuse();

    Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

/// Logger writing to an arbitrary sink, e.g. a buffer in tests.
pub fn logger_to<W>(writer: W) -> Logger
where
    W: std::io::Write + Send + 'static,
{
    let decorator = PlainDecorator::new(writer);
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = Async::new(drain).build().fuse();
    Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

/// Writes the audit record for a failed aggregate mutation. The client only
/// sees the mapped error; the full detail stays here.
pub fn audit_failure(
    logger: &Logger,
    operation: &'static str,
    subject: &str,
    error: &crate::errors::ServiceError,
) {
    slog::error!(logger, "operation failed";
        "operation" => operation,
        "subject" => subject,
        "code" => error.code(),
        "error" => %error,
        "debug" => ?error);
}

pub fn audit_success(logger: &Logger, operation: &'static str, subject: &str) {
    slog::info!(logger, "operation succeeded";
        "operation" => operation,
        "subject" => subject);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn audit_records_carry_operation_and_code() {
        let buffer = Buffer::default();
        {
            let logger = logger_to(buffer.clone());
            audit_failure(
                &logger,
                "booking.create",
                "TB00001",
                &ServiceError::Conflict("Hotel missing".into()),
            );
        }
        // Dropping the logger joins the async drain.

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("operation failed"));
        assert!(output.contains("booking.create"));
        assert!(output.contains("conflict"));
    }
}
