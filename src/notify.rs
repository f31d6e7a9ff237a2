//! Out-of-band message delivery (quick-signup credentials).

/// Fire-and-forget notification sink.
///
/// Implementations must not fail the caller; delivery problems are logged.
pub trait Notifier: Send + Sync {
    fn send(&self, recipient: &str, message: &str);
}

/// Notifier that writes messages to the log (for development)
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for LogNotifier {
    fn send(&self, recipient: &str, message: &str) {
        // Quick-signup messages carry a plaintext password
        tracing::info!(recipient = %recipient, "Notification sent");
        tracing::debug!(recipient = %recipient, message = %message, "Notification body");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn info_log_omits_message_body() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            LogNotifier::new().send("pat@example.com", "Username: pat Password: s3cr3t-pw");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Notification sent"));
        assert!(output.contains("pat@example.com"));
        assert!(!output.contains("s3cr3t-pw"));
    }
}
