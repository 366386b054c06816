/// Cumulative token usage for a whole run, bounded by a cap.
///
/// The counter only ever grows. Once `used >= cap` no further calls are
/// issued, although a single call may push `used` past the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    used: u64,
    cap: u64,
}

impl TokenBudget {
    pub fn new(cap: u64) -> Self {
        Self { used: 0, cap }
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn cap(&self) -> u64 {
        self.cap
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.cap
    }

    pub fn record(&mut self, tokens: u64) {
        self.used = self.used.saturating_add(tokens);
    }
}
