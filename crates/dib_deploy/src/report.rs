use std::fmt;

use dib_chain::ChainError;
use tracing::warn;

/// Per-pass tally of idempotent submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub applied: usize,
    pub already_present: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<String>,
}

impl PassReport {
    /// Count one submission for `item`.
    ///
    /// Returns `true` when the item is now known on chain, whether this call
    /// applied it or it was already there.
    pub fn record(&mut self, item: &str, result: Result<(), ChainError>) -> bool {
        match result {
            Ok(()) => {
                self.applied += 1;
                true
            }
            Err(err) if err.is_already_exists() => {
                warn!(item, "already registered, skipping");
                self.already_present += 1;
                true
            }
            Err(err) => {
                self.fail(item, &err);
                false
            }
        }
    }

    pub fn already_present(&mut self) {
        self.already_present += 1;
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    /// Count a failure that is logged and passed over.
    pub fn fail(&mut self, item: &str, err: &dyn fmt::Display) {
        warn!(item, error = %err, "failed, continuing with the next item");
        self.failed += 1;
        self.failures.push(format!("{item}: {err}"));
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} applied, {} already present, {} skipped, {} failed",
            self.applied, self.already_present, self.skipped, self.failed
        )
    }
}
