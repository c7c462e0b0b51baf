use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct LoadingGate {
    delay: Duration,
    started_at: Option<Instant>,
    settled: bool,
}

impl LoadingGate {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started_at: None,
            settled: delay.is_zero(),
        }
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
        if delay.is_zero() {
            self.settled = true;
        }
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        if self.settled {
            return true;
        }
        let started_at = *self.started_at.get_or_insert(now);
        if now.saturating_duration_since(started_at) >= self.delay {
            self.settled = true;
        }
        self.settled
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match (self.settled, self.started_at) {
            (true, _) => Duration::ZERO,
            (false, None) => self.delay,
            (false, Some(started_at)) => self.delay.saturating_sub(now.saturating_duration_since(started_at)),
        }
    }

    // A later poll starts the countdown over.
    pub fn cancel(&mut self) {
        self.started_at = None;
        self.settled = self.delay.is_zero();
    }

    pub fn remaining_after_poll(&mut self, now: Instant) -> Duration {
        self.poll(now);
        self.remaining(now)
    }
}
