use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `fmt` subscriber. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Like [`init_logging`] but tolerates an already-installed subscriber.
/// Tests call this from many places.
pub fn try_init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// One line summarizing a finished connection.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session: String,
    /// Player name, or the session's short id if it never got one.
    pub player: String,
    pub lines: u64,
    pub duration_ms: u128,
    pub reason: &'static str,
    /// False when the session ended on a fault rather than a quit or hangup.
    pub clean: bool,
}

impl SessionSummary {
    pub fn log(&self) {
        if self.clean {
            tracing::info!(
                session = %self.session,
                player = %self.player,
                lines = self.lines,
                duration_ms = self.duration_ms,
                reason = self.reason,
                "session ended"
            );
        } else {
            tracing::warn!(
                session = %self.session,
                player = %self.player,
                lines = self.lines,
                duration_ms = self.duration_ms,
                reason = self.reason,
                "session ended abnormally ({})",
                self.reason
            );
        }
    }
}
