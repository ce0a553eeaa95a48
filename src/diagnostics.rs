//! Per-statement diagnostics.
//!
//! Every executed statement produces one info line and one begin/end profile
//! pair, all keyed by the same token (the statement's raw AQL). The sink is a
//! trait object carried by the [`Connection`](crate::Connection).

use std::fmt;
use std::time::{Duration, Instant};

/// Category used for statement diagnostics.
pub const QUERY_CATEGORY: &str = "aranguard::query";

/// Receiver of statement diagnostics.
pub trait Diagnostics: Send + Sync {
    fn info(&self, token: &str, category: &str);
    fn begin_profile(&self, token: &str, category: &str);
    fn end_profile(&self, token: &str, category: &str, elapsed: Duration);
}

/// Default sink: `log` records plus the optional metrics counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn info(&self, token: &str, category: &str) {
        log::info!(target: "aranguard::query", "[{category}] {token}");
    }

    fn begin_profile(&self, token: &str, category: &str) {
        log::debug!(target: "aranguard::profile", "begin [{category}] {token}");
    }

    fn end_profile(&self, token: &str, category: &str, elapsed: Duration) {
        log::debug!(
            target: "aranguard::profile",
            "end [{category}] {token} ({:.3}ms)",
            elapsed.as_secs_f64() * 1000.0
        );
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_query(elapsed);
    }
}

/// Open profile block; closed by [`ProfileSpan::end`] or on drop, exactly once.
pub struct ProfileSpan<'a> {
    diagnostics: &'a dyn Diagnostics,
    token: &'a str,
    category: &'a str,
    started: Instant,
    open: bool,
}

impl<'a> ProfileSpan<'a> {
    pub fn begin(diagnostics: &'a dyn Diagnostics, token: &'a str, category: &'a str) -> Self {
        diagnostics.begin_profile(token, category);
        Self {
            diagnostics,
            token,
            category,
            started: Instant::now(),
            open: true,
        }
    }

    pub fn end(mut self) -> Duration {
        self.close()
    }

    fn close(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        if self.open {
            self.open = false;
            self.diagnostics.end_profile(self.token, self.category, elapsed);
        }
        elapsed
    }
}

impl Drop for ProfileSpan<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ProfileSpan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileSpan")
            .field("token", &self.token)
            .field("category", &self.category)
            .field("open", &self.open)
            .finish()
    }
}
