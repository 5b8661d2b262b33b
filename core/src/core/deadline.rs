use std::time::Duration;

use tokio::time::Instant;

/// Global run budget, computed once at start and checked before each unit of work.
///
/// A budget too large to represent as an instant never expires.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self { at: Instant::now().checked_add(budget) }
    }

    /// A deadline that has already passed.
    pub fn expired() -> Self {
        Self { at: Some(Instant::now()) }
    }

    pub fn remaining(&self) -> Duration {
        match self.at {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}
