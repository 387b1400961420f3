use std::time::Duration;

/// Tuning knobs for the ledger services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Total read-mutate-write attempts per operation, the first one included.
    pub max_commit_attempts: usize,
    /// Upper bound on a single commit. Exceeding it leaves the outcome unknown.
    pub commit_timeout: Duration,
}

impl LedgerConfig {
    pub const DEFAULT_MAX_COMMIT_ATTEMPTS: usize = 5;
    pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn with_max_commit_attempts(mut self, attempts: usize) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }

    pub fn with_commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = timeout;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: Self::DEFAULT_MAX_COMMIT_ATTEMPTS,
            commit_timeout: Self::DEFAULT_COMMIT_TIMEOUT,
        }
    }
}
