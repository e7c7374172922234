use std::time::{Duration, Instant};

/// Deadline for one bounded unit of interactive work.
///
/// Iterative components poll [`TimeLimit::expired`] between units of work and return their
/// best result so far once it reports `true`.
#[derive(Debug, Clone, Copy)]
pub struct TimeLimit {
    started: Instant,
    budget: Option<Duration>,
}

impl TimeLimit {
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget: Some(budget),
        }
    }

    /// Budget in milliseconds as configured, `None` meaning no limit.
    pub fn from_millis(maybe_millis: Option<u64>) -> Self {
        match maybe_millis {
            Some(millis) => Self::new(Duration::from_millis(millis)),
            None => Self::unlimited(),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            started: Instant::now(),
            budget: None,
        }
    }

    /// Restarts the countdown with the same budget.
    pub fn start(&mut self) {
        self.started = Instant::now();
    }

    pub fn expired(&self) -> bool {
        match self.budget {
            Some(budget) => budget.is_zero() || self.started.elapsed() >= budget,
            None => false,
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .map(|budget| budget.saturating_sub(self.started.elapsed()))
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_expired_immediately() {
        let limit = TimeLimit::new(Duration::ZERO);
        assert!(limit.expired());
        assert_eq!(limit.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_unlimited_never_expires() {
        let limit = TimeLimit::unlimited();
        assert!(!limit.expired());
        assert_eq!(limit.remaining(), None);
    }

    #[test]
    fn test_restart() {
        let mut limit = TimeLimit::new(Duration::from_secs(3600));
        limit.start();
        assert!(!limit.expired());
        assert!(limit.remaining().unwrap() <= Duration::from_secs(3600));
    }
}
