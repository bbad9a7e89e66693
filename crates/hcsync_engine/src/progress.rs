//! Pass progress.

/// Records processed out of records fetched during one pass.
///
/// # Invariants
///
/// - `synced <= total`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressCounter {
    synced: usize,
    total: usize,
}

impl ProgressCounter {
    /// Creates a counter for `total` records.
    pub fn new(total: usize) -> Self {
        Self { synced: 0, total }
    }

    /// Marks `count` more records as processed.
    pub fn advance(&mut self, count: usize) {
        self.synced = self.synced.saturating_add(count).min(self.total);
    }

    /// Records processed so far.
    pub fn synced(&self) -> usize {
        self.synced
    }

    /// Records fetched.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns true once every record has been processed.
    pub fn is_complete(&self) -> bool {
        self.synced == self.total
    }

    /// Approximate completion, 0 to 100. An empty pass is complete.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        // synced <= total, so the quotient is at most 100.
        u8::try_from(self.synced * 100 / self.total).unwrap_or(100)
    }
}

impl std::fmt::Display for ProgressCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.synced, self.total)
    }
}
